use std::sync::Arc;

use bytes::Bytes;
use sift_codec::{
    APPLICATION_JSON, APPLICATION_NDJSON, Codec, CodecError, Dispatcher, MimeType, Result,
    SerializerConfig, Value,
};
use tracing::debug;

use crate::bulk::{BulkItem, bulk_body};

/// 编码后的请求体及其出站 `Content-Type`。
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedRequest {
    content_type: MimeType,
    body: Bytes,
}

impl EncodedRequest {
    /// 出站 `Content-Type`。
    pub fn content_type(&self) -> &MimeType {
        &self.content_type
    }

    /// 请求体字节。
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// 拆成头值与请求体，交给传输层。
    pub fn into_parts(self) -> (String, Bytes) {
        (self.content_type.to_string(), self.body)
    }
}

/// `ClientSerializers` 是客户端与编解码层之间的唯一边界。
///
/// # 设计背景（Why）
/// - 客户端启动时构造一次，之后所有请求共享；覆盖项与默认类型原样转交给 [`Dispatcher`]；
/// - 响应侧按响应头协商，请求侧的目标类型由请求构建方决定，缺省为 `application/json`。
///
/// # 契约说明（What）
/// - 克隆只增加引用计数，可在任意线程间共享；
/// - 所有失败都是 [`CodecError`]，不做二次包装。
#[derive(Clone, Debug)]
pub struct ClientSerializers {
    dispatcher: Dispatcher,
}

impl ClientSerializers {
    /// 以覆盖项与默认类型构造。
    pub fn new<K, I>(codec_overrides: I, default_mime_type: &str) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Arc<dyn Codec>)>,
    {
        Dispatcher::new(codec_overrides, default_mime_type).map(Self::from_dispatcher)
    }

    /// 以启动配置构造。
    pub fn from_config(config: SerializerConfig) -> Result<Self> {
        Dispatcher::builder()
            .config(config)
            .build()
            .map(Self::from_dispatcher)
    }

    /// 包装已构造好的分发器，用于需要回退钩子等构造器选项的场景。
    pub fn from_dispatcher(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// 底层分发器。
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// 按响应头解码响应体。
    pub fn decode_response(&self, body: &[u8], content_type: Option<&str>) -> Result<Value> {
        self.dispatcher.decode(body, content_type)
    }

    /// 把请求值编码为 `mime_type`（缺省 `application/json`）。
    ///
    /// 出站类型取编解码器的声明类型；声明类型与请求类型一致时保留请求中的参数（例如 `compatible-with`）。
    /// 目标类型无法解析或没有对应编解码器时返回 `UnsupportedMediaType`。
    pub fn encode_request(&self, value: &Value, mime_type: Option<&str>) -> Result<EncodedRequest> {
        let requested = self.request_type(mime_type.unwrap_or(APPLICATION_JSON))?;
        let codec = self.codec_for(&requested)?;
        let body = codec.encode(value)?;
        let content_type = if codec.mime_type().essence() == requested.essence() {
            requested
        } else {
            codec.mime_type().clone()
        };
        debug!(
            content_type = %content_type,
            codec = codec.descriptor().name(),
            bytes = body.len(),
            "encoded request body"
        );
        Ok(EncodedRequest { content_type, body })
    }

    /// 用注册表中的 JSON 编解码器构造批量请求体，出站类型为 `application/x-ndjson`。
    pub fn encode_bulk<I>(&self, items: I) -> Result<EncodedRequest>
    where
        I: IntoIterator,
        I::Item: Into<BulkItem>,
    {
        let json = self.codec_for(&self.request_type(APPLICATION_JSON)?)?;
        let body = bulk_body(&*json, items)?;
        Ok(EncodedRequest {
            content_type: self.request_type(APPLICATION_NDJSON)?,
            body,
        })
    }

    fn request_type(&self, raw: &str) -> Result<MimeType> {
        MimeType::parse(raw).map_err(|err| self.unsupported(err.raw().trim()))
    }

    fn codec_for(&self, mime_type: &MimeType) -> Result<Arc<dyn Codec>> {
        self.dispatcher
            .registry()
            .get(mime_type)
            .ok_or_else(|| self.unsupported(&mime_type.essence()))
    }

    fn unsupported(&self, requested: &str) -> CodecError {
        CodecError::UnsupportedMediaType {
            requested: requested.to_owned(),
            known: self.dispatcher.registry().known_types(),
        }
    }
}
