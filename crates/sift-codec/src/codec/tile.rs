use bytes::Bytes;

use super::{Codec, CodecDescriptor};
use crate::error::{CodecError, Result};
use crate::value::Value;

/// `application/vnd.mapbox-vector-tile` 编解码器。
///
/// 矢量瓦片由服务端生成，客户端不解析其内部 protobuf 结构，两个方向都逐字节透传。
#[derive(Debug, Clone)]
pub struct TileCodec {
    descriptor: CodecDescriptor,
}

impl TileCodec {
    /// 构建瓦片编解码器。
    pub fn new() -> Self {
        Self {
            descriptor: CodecDescriptor::builtin(
                "mapbox-vector-tile",
                "application",
                "vnd.mapbox-vector-tile",
            ),
        }
    }
}

impl Default for TileCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for TileCodec {
    fn descriptor(&self) -> &CodecDescriptor {
        &self.descriptor
    }

    fn encode(&self, value: &Value) -> Result<Bytes> {
        match value {
            Value::Bytes(raw) => Ok(raw.clone()),
            other => Err(CodecError::unencodable(
                other.type_name(),
                self.descriptor.mime_type().essence(),
            )),
        }
    }

    fn decode(&self, raw: &[u8]) -> Result<Value> {
        Ok(Value::Bytes(Bytes::copy_from_slice(raw)))
    }
}
