use bytes::Bytes;

use super::{Codec, CodecDescriptor};
use crate::error::{CodecError, Result};
use crate::value::Value;

/// `text/plain` 编解码器：文本原样透传。
///
/// # 行为概览（How）
/// - `encode`：仅接受 [`Value::String`]，其他值返回 `UnencodableValue`；
/// - `decode`：校验 UTF-8 后返回 [`Value::String`]，空输入得到空字符串。
#[derive(Debug, Clone)]
pub struct TextCodec {
    descriptor: CodecDescriptor,
}

impl TextCodec {
    /// 构建纯文本编解码器。
    pub fn new() -> Self {
        Self {
            descriptor: CodecDescriptor::builtin("text", "text", "plain"),
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for TextCodec {
    fn descriptor(&self) -> &CodecDescriptor {
        &self.descriptor
    }

    fn encode(&self, value: &Value) -> Result<Bytes> {
        match value {
            Value::String(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            other => Err(CodecError::unencodable(
                other.type_name(),
                self.descriptor.mime_type().essence(),
            )),
        }
    }

    fn decode(&self, raw: &[u8]) -> Result<Value> {
        match std::str::from_utf8(raw) {
            Ok(text) => Ok(Value::String(text.to_owned())),
            Err(err) => Err(CodecError::malformed(
                self.descriptor.mime_type().essence(),
                err,
            )),
        }
    }
}
