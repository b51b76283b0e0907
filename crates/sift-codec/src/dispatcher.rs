use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::codec::{Codec, FallbackHook, JsonCodec};
use crate::config::SerializerConfig;
use crate::error::{CodecError, Result};
use crate::mime::{APPLICATION_JSON, COMPATIBILITY_JSON, MimeType};
use crate::registry::CodecRegistry;
use crate::resolver::{ContentTypeResolver, ResolvedCodec};
use crate::value::Value;

/// 响应体解码的门面：注册表加默认类型。
///
/// # 设计背景（Why）
/// - 解码侧面对的是不可预测的服务端响应，内容类型需要协商；编码侧的目标类型由请求构建方事先确定，
///   因此编码直接走注册表查找，不经过分发器。
///
/// # 逻辑解析（How）
/// - 构造时组装注册表（内置实现在前，调用方覆盖在后），并校验默认类型能在其中命中；
/// - `decode` 借助 [`ContentTypeResolver`] 选出编解码器后原样委托，编解码器的错误不做二次包装。
///
/// # 契约说明（What）
/// - **前置条件**：构造在客户端启动阶段完成一次；
/// - **后置条件**：实例只读，克隆代价为一次 `Arc` 计数，可在任意线程并发调用 `decode`。
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CodecRegistry>,
    default_mime_type: MimeType,
}

impl Dispatcher {
    /// 以覆盖项与默认类型构造。
    ///
    /// 覆盖项在内置实现之后注册，同键覆盖内置实现；默认类型无法在组装后的注册表中命中时构造失败。
    pub fn new<K, I>(codec_overrides: I, default_mime_type: &str) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Arc<dyn Codec>)>,
    {
        let mut builder = Self::builder()
            .config(SerializerConfig::default().with_default_mime_type(default_mime_type));
        for (mime_type, codec) in codec_overrides {
            builder = builder.codec(mime_type.as_ref(), codec);
        }
        builder.build()
    }

    /// 仅含内置实现、默认类型为 `application/json` 的分发器。
    pub fn with_builtins() -> Result<Self> {
        Self::from_registry(CodecRegistry::with_builtins(), APPLICATION_JSON)
    }

    /// 以已组装好的注册表构造。
    pub fn from_registry(registry: CodecRegistry, default_mime_type: &str) -> Result<Self> {
        let default_mime_type = MimeType::parse(default_mime_type).map_err(|err| {
            CodecError::configuration(format!("invalid default media type: {err}"))
        })?;
        if default_mime_type.is_wildcard() {
            return Err(CodecError::configuration(format!(
                "default media type `{default_mime_type}` must not be a wildcard"
            )));
        }
        let default_mime_type = default_mime_type.without_params();
        if registry.get(&default_mime_type).is_none() {
            return Err(CodecError::configuration(format!(
                "cannot find default codec `{default_mime_type}`, known types: [{}]",
                registry.known_types().join(", ")
            )));
        }

        info!(
            default = %default_mime_type,
            codecs = registry.len(),
            "codec dispatcher ready"
        );
        Ok(Self {
            registry: Arc::new(registry),
            default_mime_type,
        })
    }

    /// 构造器入口。
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// 按响应头解码响应体。
    pub fn decode(&self, body: impl AsRef<[u8]>, content_type: Option<&str>) -> Result<Value> {
        let resolved = self.resolve(content_type)?;
        resolved.codec().decode(body.as_ref())
    }

    /// 只做解析，不解码。
    pub fn resolve(&self, content_type: Option<&str>) -> Result<ResolvedCodec> {
        ContentTypeResolver::new(&self.registry, &self.default_mime_type).resolve(content_type)
    }

    /// 只读访问注册表，编码侧经由它查找编解码器。
    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// 配置的默认类型。
    pub fn default_mime_type(&self) -> &MimeType {
        &self.default_mime_type
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("default_mime_type", &self.default_mime_type)
            .finish()
    }
}

/// [`Dispatcher`] 的构造器。
///
/// 注册顺序固定：内置实现、带回退钩子的 JSON 实现、兼容模式类型、调用方覆盖项。
#[derive(Default)]
pub struct DispatcherBuilder {
    config: SerializerConfig,
    overrides: Vec<(String, Arc<dyn Codec>)>,
    fallback: Option<FallbackHook>,
}

impl DispatcherBuilder {
    /// 替换整个配置。
    pub fn config(mut self, config: SerializerConfig) -> Self {
        self.config = config;
        self
    }

    /// 替换默认类型。
    pub fn default_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.config.default_mime_type = mime_type.into();
        self
    }

    /// 追加一个覆盖项。
    pub fn codec(mut self, mime_type: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        self.overrides.push((mime_type.into(), codec));
        self
    }

    /// 为内置 JSON 实现配置回退钩子。
    pub fn fallback(mut self, hook: FallbackHook) -> Self {
        self.fallback = Some(hook);
        self
    }

    /// 组装注册表并校验默认类型。
    pub fn build(self) -> Result<Dispatcher> {
        let mut registry = CodecRegistry::with_builtins();

        if let Some(hook) = &self.fallback {
            registry.register(
                APPLICATION_JSON,
                Arc::new(JsonCodec::new().with_fallback(hook.clone())),
            )?;
        }

        if self.config.compatibility_mode {
            let mut codec = JsonCodec::with_mime_type(MimeType::concrete(
                "application",
                "vnd.elasticsearch+json",
            ))?;
            if let Some(hook) = &self.fallback {
                codec = codec.with_fallback(hook.clone());
            }
            registry.register(COMPATIBILITY_JSON, Arc::new(codec))?;
        }

        for (mime_type, codec) in self.overrides {
            debug!(mime_type = %mime_type, "applying codec override");
            registry.register(&mime_type, codec)?;
        }

        Dispatcher::from_registry(registry, &self.config.default_mime_type)
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("config", &self.config)
            .field(
                "overrides",
                &self.overrides.iter().map(|(key, _)| key).collect::<Vec<_>>(),
            )
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecDescriptor, TextCodec};
    use crate::error::codes;
    use crate::mime::TEXT_PLAIN;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    /// 记录调用次数的 JSON 替身。
    struct CountingCodec {
        descriptor: CodecDescriptor,
        decodes: AtomicUsize,
    }

    impl CountingCodec {
        fn new() -> Self {
            Self {
                descriptor: CodecDescriptor::new(
                    "counting",
                    MimeType::parse(APPLICATION_JSON).expect("valid"),
                )
                .expect("concrete"),
                decodes: AtomicUsize::new(0),
            }
        }
    }

    impl Codec for CountingCodec {
        fn descriptor(&self) -> &CodecDescriptor {
            &self.descriptor
        }

        fn encode(&self, _value: &Value) -> Result<Bytes> {
            Ok(Bytes::from_static(b"counted"))
        }

        fn decode(&self, _raw: &[u8]) -> Result<Value> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from("counted"))
        }
    }

    #[test]
    fn default_dispatcher_decodes_json() {
        let dispatcher = Dispatcher::with_builtins().expect("builtins");
        let value = dispatcher
            .decode(br#"{"ok":true}"#, Some("application/json; charset=utf-8"))
            .expect("valid json");
        assert_eq!(value.get("ok"), Some(&Value::Bool(true)));
    }

    #[test]
    fn unknown_default_fails_construction() {
        let overrides: Vec<(&str, Arc<dyn Codec>)> = Vec::new();
        let err = Dispatcher::new(overrides, "application/xml").expect_err("no xml codec");
        assert_eq!(err.code(), codes::CONFIGURATION);

        let err = Dispatcher::from_registry(CodecRegistry::with_builtins(), "*/*")
            .expect_err("wildcard default");
        assert!(err.is_configuration());
    }

    #[test]
    fn default_with_parameters_is_accepted() {
        let dispatcher = Dispatcher::builder()
            .default_mime_type("text/plain; charset=utf-8")
            .build()
            .expect("text default");
        assert_eq!(dispatcher.default_mime_type().essence(), TEXT_PLAIN);
        assert_eq!(
            dispatcher.decode(b"", None).expect("empty text"),
            Value::from("")
        );
    }

    #[test]
    fn override_replaces_builtin() {
        let counting = Arc::new(CountingCodec::new());
        let dispatcher = Dispatcher::new(
            [(APPLICATION_JSON, counting.clone() as Arc<dyn Codec>)],
            APPLICATION_JSON,
        )
        .expect("override registered");
        let value = dispatcher
            .decode(b"{}", Some(APPLICATION_JSON))
            .expect("custom decode");
        assert_eq!(value, Value::from("counted"));
        assert_eq!(counting.decodes.load(Ordering::SeqCst), 1);
        assert!(dispatcher.registry().contains(TEXT_PLAIN));
    }

    #[test]
    fn overrides_can_add_new_types() {
        let dispatcher = Dispatcher::builder()
            .codec("text/csv", Arc::new(TextCodec::new()))
            .build()
            .expect("csv registered");
        assert_eq!(
            dispatcher.decode("a,b", Some("text/csv")).expect("csv as text"),
            Value::from("a,b")
        );
    }

    #[test]
    fn wildcard_override_is_rejected() {
        let err = Dispatcher::builder()
            .codec("text/*", Arc::new(TextCodec::new()))
            .build()
            .expect_err("wildcard key");
        assert!(err.is_configuration());
    }

    #[traced_test]
    #[test]
    fn compatibility_mode_decodes_vendor_json() {
        let dispatcher = Dispatcher::builder()
            .config(SerializerConfig::default().with_compatibility_mode(true))
            .build()
            .expect("compat registered");
        let value = dispatcher
            .decode(
                br#"{"hits":1}"#,
                Some("application/vnd.elasticsearch+json; compatible-with=8"),
            )
            .expect("vendor json");
        assert_eq!(value.get("hits").and_then(Value::as_i64), Some(1));
        assert!(logs_contain("codec dispatcher ready"));
    }

    #[test]
    fn compatibility_type_is_unknown_by_default() {
        let dispatcher = Dispatcher::with_builtins().expect("builtins");
        let err = dispatcher
            .decode(b"{}", Some(COMPATIBILITY_JSON))
            .expect_err("vendor json not registered");
        assert_eq!(err.code(), codes::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn fallback_hook_reaches_builtin_json() {
        let hook: FallbackHook = Arc::new(|value: &Value| {
            value
                .as_bytes()
                .map(|raw| serde_json::Value::from(raw.len() as u64))
        });
        let dispatcher = Dispatcher::builder().fallback(hook).build().expect("hooked");
        let json = dispatcher
            .registry()
            .lookup_exact(APPLICATION_JSON)
            .expect("json codec");
        let encoded = json
            .encode(&Value::bytes(Bytes::from_static(b"abc")))
            .expect("hook encodes bytes");
        assert_eq!(&encoded[..], b"3");
    }
}
