use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value as Json};
use tracing::trace;

use super::{Codec, CodecDescriptor};
use crate::error::{CodecError, Result};
use crate::mime::MimeType;
use crate::value::{NumericArray, NumericData, Temporal, Value};

/// 调用方提供的回退钩子：为扩展转换表不认识的值给出 JSON 表示，返回 `None` 表示同样无法处理。
pub type FallbackHook = Arc<dyn Fn(&Value) -> Option<Json> + Send + Sync>;

/// 扩展转换：不适用时返回 `None`，适用时返回转换结果。
type Extension = fn(&JsonCodec, &Value) -> Option<Result<Json>>;

/// 扩展转换表，按固定顺序尝试，第一个适用的转换生效。
const EXTENSIONS: [(&str, Extension); 5] = [
    ("temporal", encode_temporal),
    ("decimal", encode_decimal),
    ("uuid", encode_uuid),
    ("set", encode_set),
    ("array", encode_array),
];

/// 结构化 JSON 编解码器。
///
/// # 设计动机（Why）
/// - 请求体是“JSON 超集”：原生值直接编码，扩展类型经固定顺序的转换表落为字符串或结构，
///   仍无法处理的值交给调用方的回退钩子，最后以 `UnencodableValue` 收尾，绝不静默字符串化。
///
/// # 行为概览（How）
/// - 编码：[`JsonCodec::to_json`] 递归遍历值树，原生值原样映射，其余值依次尝试
///   日期时间、定点小数、UUID、集合、数组/表格五个转换，再尝试回退钩子；
/// - 解码：标准 JSON 解析，结果转为通用 [`Value`]，空输入视为格式错误。
///
/// # 契约说明（What）
/// - 编码输出紧凑（无多余空白），对同一输入确定；
/// - 解码不会重建扩展类型：日期回来是字符串，小数回来是字符串。
#[derive(Clone)]
pub struct JsonCodec {
    descriptor: CodecDescriptor,
    fallback: Option<FallbackHook>,
}

impl JsonCodec {
    /// 构建声明为 `application/json` 的编解码器。
    pub fn new() -> Self {
        Self {
            descriptor: CodecDescriptor::builtin("json", "application", "json"),
            fallback: None,
        }
    }

    /// 以其他 JSON 家族类型声明（例如兼容模式的厂商类型）。
    pub fn with_mime_type(mime_type: MimeType) -> Result<Self> {
        Ok(Self {
            descriptor: CodecDescriptor::new("json", mime_type.without_params())?,
            fallback: None,
        })
    }

    /// 设置回退钩子。
    pub fn with_fallback(mut self, hook: FallbackHook) -> Self {
        self.fallback = Some(hook);
        self
    }

    /// 把值转换为 JSON 树，编码与批量请求共用这一步。
    pub fn to_json(&self, value: &Value) -> Result<Json> {
        match value {
            Value::Null => Ok(Json::Null),
            Value::Bool(b) => Ok(Json::Bool(*b)),
            Value::Number(n) => Ok(Json::Number(n.clone())),
            Value::String(s) => Ok(Json::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| self.to_json(item))
                .collect::<Result<Vec<_>>>()
                .map(Json::Array),
            Value::Object(map) => map
                .iter()
                .map(|(key, item)| {
                    Ok::<_, CodecError>((key.clone(), self.to_json(item)?))
                })
                .collect::<Result<Map<_, _>>>()
                .map(Json::Object),
            other => self.extend(other),
        }
    }

    fn extend(&self, value: &Value) -> Result<Json> {
        for (name, extension) in EXTENSIONS {
            if let Some(converted) = extension(self, value) {
                trace!(extension = name, value_type = value.type_name(), "json extension applied");
                return converted;
            }
        }

        if let Some(hook) = &self.fallback
            && let Some(converted) = hook(value)
        {
            trace!(value_type = value.type_name(), "json fallback hook applied");
            return Ok(converted);
        }

        Err(CodecError::unencodable(
            value.type_name(),
            self.descriptor.mime_type().essence(),
        ))
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec")
            .field("descriptor", &self.descriptor)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Codec for JsonCodec {
    fn descriptor(&self) -> &CodecDescriptor {
        &self.descriptor
    }

    fn encode(&self, value: &Value) -> Result<Bytes> {
        let json = self.to_json(value)?;
        serde_json::to_vec(&json)
            .map(Bytes::from)
            .map_err(|err| CodecError::malformed(self.descriptor.mime_type().essence(), err))
    }

    fn decode(&self, raw: &[u8]) -> Result<Value> {
        serde_json::from_slice::<Json>(raw)
            .map(Value::from)
            .map_err(|err| CodecError::malformed(self.descriptor.mime_type().essence(), err))
    }
}

fn encode_temporal(_: &JsonCodec, value: &Value) -> Option<Result<Json>> {
    let Value::Temporal(temporal) = value else {
        return None;
    };
    let text = match temporal {
        Temporal::Date(date) => date.format("%Y-%m-%d").to_string(),
        Temporal::Time(time) => time.format("%H:%M:%S%.f").to_string(),
        Temporal::DateTime(datetime) => datetime.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        Temporal::Zoned(datetime) => datetime.to_rfc3339_opts(SecondsFormat::AutoSi, false),
    };
    Some(Ok(Json::String(text)))
}

fn encode_decimal(_: &JsonCodec, value: &Value) -> Option<Result<Json>> {
    let Value::Decimal(decimal) = value else {
        return None;
    };
    Some(Ok(Json::String(decimal.to_string())))
}

fn encode_uuid(_: &JsonCodec, value: &Value) -> Option<Result<Json>> {
    let Value::Uuid(uuid) = value else {
        return None;
    };
    Some(Ok(Json::String(uuid.hyphenated().to_string())))
}

fn encode_set(codec: &JsonCodec, value: &Value) -> Option<Result<Json>> {
    let Value::Set(set) = value else {
        return None;
    };
    Some(
        set.iter()
            .map(|item| codec.to_json(item))
            .collect::<Result<Vec<_>>>()
            .map(Json::Array),
    )
}

fn encode_array(codec: &JsonCodec, value: &Value) -> Option<Result<Json>> {
    match value {
        Value::NdArray(array) => Some(Ok(nest_array(array))),
        Value::Table(table) => Some(
            table
                .columns()
                .map(|(name, values)| {
                    let column = values
                        .iter()
                        .map(|item| codec.to_json(item))
                        .collect::<Result<Vec<_>>>()?;
                    Ok::<_, CodecError>((name.to_owned(), Json::Array(column)))
                })
                .collect::<Result<Map<_, _>>>()
                .map(Json::Object),
        ),
        _ => None,
    }
}

fn nest_array(array: &NumericArray) -> Json {
    match array.data() {
        NumericData::Int(data) => nest(array.shape(), data, |n| Json::Number(Number::from(*n))),
        NumericData::Float(data) => nest(array.shape(), data, |n| {
            Number::from_f64(*n).map_or(Json::Null, Json::Number)
        }),
    }
}

// 行优先：第一维切分为等长块，逐层递归直到零维标量。
// 零长度维直接返回空数组，其后各维的长度之积可能溢出，不能参与计算。
fn nest<T>(shape: &[usize], data: &[T], scalar: fn(&T) -> Json) -> Json {
    let Some((&len, rest)) = shape.split_first() else {
        return data.first().map_or(Json::Null, scalar);
    };
    if len == 0 {
        return Json::Array(Vec::new());
    }
    let stride: usize = rest.iter().product();
    Json::Array(
        (0..len)
            .map(|i| nest(rest, &data[i * stride..(i + 1) * stride], scalar))
            .collect(),
    )
}
