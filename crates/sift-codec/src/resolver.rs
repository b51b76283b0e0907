//! 把原始 `Content-Type` 头解析为具体编解码器。
//!
//! # 设计背景（Why）
//! - 传输层不应自行解析内容类型；它把响应头原样交给解析器，由解析器决定使用哪个编解码器。
//!
//! # 逻辑解析（How）
//! 1. 头缺失或为空白：直接使用分发器配置的默认类型；
//! 2. 只取第一个逗号分隔的类型，解析出主体与参数，参数不参与选择；
//! 3. 主体在注册表中精确命中即返回；
//! 4. 未命中且为 `type/*` 或 `*/*`：不做模糊匹配，回退到默认类型；
//! 5. 其余情况返回 `UnsupportedMediaType`，并附上注册表中的已知类型。
//!
//! # 风险提示（Trade-offs）
//! - 第 4 步的通配符回退与常见的内容协商语义不同，但改变它会改变客户端对异常响应的可观察行为，因此保持原样。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::{CodecError, Result};
use crate::mime::MimeType;
use crate::registry::CodecRegistry;

/// 选中编解码器的依据。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionSource {
    /// 响应头精确命中。
    Header,
    /// 响应头缺失或为空，使用默认类型。
    MissingHeader,
    /// 响应头为通配符，使用默认类型。
    Wildcard,
}

/// 一次解析的结果。
#[derive(Clone)]
pub struct ResolvedCodec {
    mime_type: MimeType,
    codec: Arc<dyn Codec>,
    source: ResolutionSource,
}

impl ResolvedCodec {
    /// 实际生效的类型；来自响应头时保留其参数（例如 `charset`）。
    pub fn mime_type(&self) -> &MimeType {
        &self.mime_type
    }

    /// 选中的编解码器。
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    /// 选中依据。
    pub fn source(&self) -> ResolutionSource {
        self.source
    }
}

impl std::fmt::Debug for ResolvedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCodec")
            .field("mime_type", &self.mime_type)
            .field("codec", &self.codec.descriptor().name())
            .field("source", &self.source)
            .finish()
    }
}

/// 借用注册表与默认类型的解析器，构造代价可以忽略，每次解码临时创建。
#[derive(Clone, Copy, Debug)]
pub struct ContentTypeResolver<'a> {
    registry: &'a CodecRegistry,
    default_mime_type: &'a MimeType,
}

impl<'a> ContentTypeResolver<'a> {
    /// 绑定注册表与默认类型。
    pub fn new(registry: &'a CodecRegistry, default_mime_type: &'a MimeType) -> Self {
        Self {
            registry,
            default_mime_type,
        }
    }

    /// 解析响应头。
    pub fn resolve(&self, content_type: Option<&str>) -> Result<ResolvedCodec> {
        let header = content_type.map(str::trim).unwrap_or_default();
        if header.is_empty() {
            debug!(default = %self.default_mime_type, "no content type, using default codec");
            return self.resolve_default(ResolutionSource::MissingHeader);
        }

        let mime_type = match MimeType::parse(header) {
            Ok(mime_type) => mime_type,
            Err(err) => {
                warn!(error = %err, "unparsable content type");
                return Err(self.unsupported(err.raw().trim()));
            }
        };

        if let Some(codec) = self.registry.get(&mime_type) {
            return Ok(ResolvedCodec {
                mime_type,
                codec,
                source: ResolutionSource::Header,
            });
        }

        if mime_type.is_wildcard() {
            warn!(
                requested = %mime_type,
                default = %self.default_mime_type,
                "wildcard content type, falling back to default codec"
            );
            return self.resolve_default(ResolutionSource::Wildcard);
        }

        warn!(requested = %mime_type.essence(), "no codec for content type");
        Err(self.unsupported(&mime_type.essence()))
    }

    fn resolve_default(&self, source: ResolutionSource) -> Result<ResolvedCodec> {
        let codec = self
            .registry
            .get(self.default_mime_type)
            .ok_or_else(|| self.unsupported(&self.default_mime_type.essence()))?;
        Ok(ResolvedCodec {
            mime_type: self.default_mime_type.clone(),
            codec,
            source,
        })
    }

    fn unsupported(&self, requested: &str) -> CodecError {
        CodecError::UnsupportedMediaType {
            requested: requested.to_owned(),
            known: self.registry.known_types(),
        }
    }
}
