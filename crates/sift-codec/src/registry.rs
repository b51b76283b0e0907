use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::codec::{Codec, JsonCodec, TextCodec, TileCodec};
use crate::error::{CodecError, Result};
use crate::mime::MimeType;

/// `CodecRegistry` 把具体 MIME 类型映射到编解码器。
///
/// # 设计背景（Why）
/// - 客户端需要同时处理文本、JSON 与二进制瓦片等多种响应体，且允许调用方覆盖内置实现；
///   注册表是这些实现的唯一索引。
///
/// # 逻辑解析（How）
/// - 键为解析后的 `type/subtype` 主体（小写、去参数），存放于 `BTreeMap`，已知类型列表因此有稳定顺序；
/// - 同一键的后一次注册覆盖前一次（后写者胜），内置实现因此可以被替换。
///
/// # 契约说明（What）
/// - **前置条件**：`register` 只在客户端启动阶段调用；一旦注册表被包进 [`crate::Dispatcher`]，
///   就只剩只读访问，借用规则保证不会有写入与并发读取竞争；
/// - **后置条件**：`lookup_exact(m)` 返回最后一次以 `m` 注册的编解码器。
///
/// # 风险提示（Trade-offs）
/// - 不做任何模糊匹配，通配符键在注册时即被拒绝。
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: BTreeMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// 空注册表。
    pub fn empty() -> Self {
        Self::default()
    }

    /// 预置三个内置编解码器：`text/plain`、`application/json`、
    /// `application/vnd.mapbox-vector-tile`。
    pub fn with_builtins() -> Self {
        let builtins: [Arc<dyn Codec>; 3] = [
            Arc::new(TextCodec::new()),
            Arc::new(JsonCodec::new()),
            Arc::new(TileCodec::new()),
        ];
        let codecs = builtins
            .into_iter()
            .map(|codec| (codec.mime_type().essence(), codec))
            .collect();
        debug!("seeded codec registry with built-in codecs");
        Self { codecs }
    }

    /// 以 `mime_type` 为键注册编解码器，返回被替换的旧实现。
    ///
    /// 键无法解析或为通配符时返回 `Configuration` 错误，这属于调用方的编程错误。
    pub fn register(
        &mut self,
        mime_type: &str,
        codec: Arc<dyn Codec>,
    ) -> Result<Option<Arc<dyn Codec>>> {
        let key = MimeType::parse(mime_type).map_err(|err| {
            CodecError::configuration(format!("cannot register codec: {err}"))
        })?;
        if key.is_wildcard() {
            return Err(CodecError::configuration(format!(
                "cannot register codec under wildcard media type `{mime_type}`"
            )));
        }

        let essence = key.essence();
        debug!(
            mime_type = %essence,
            codec = codec.descriptor().name(),
            "registering codec"
        );
        let previous = self.codecs.insert(essence, codec);
        if let Some(replaced) = &previous {
            debug!(replaced = replaced.descriptor().name(), "codec override replaced an existing entry");
        }
        Ok(previous)
    }

    /// 按主体精确查找；参数与大小写不影响结果，无法解析的输入视为未命中。
    pub fn lookup_exact(&self, mime_type: &str) -> Option<Arc<dyn Codec>> {
        let key = MimeType::parse(mime_type).ok()?;
        self.get(&key)
    }

    /// 以已解析的类型查找。
    pub fn get(&self, mime_type: &MimeType) -> Option<Arc<dyn Codec>> {
        self.codecs.get(&mime_type.essence()).cloned()
    }

    /// 是否存在该类型的编解码器。
    pub fn contains(&self, mime_type: &str) -> bool {
        self.lookup_exact(mime_type).is_some()
    }

    /// 按字典序列出已知类型，供诊断使用。
    pub fn known_types(&self) -> Vec<String> {
        self.codecs.keys().cloned().collect()
    }

    /// 已注册的类型数。
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.codecs
                    .iter()
                    .map(|(key, codec)| (key, codec.descriptor().name())),
            )
            .finish()
    }
}
