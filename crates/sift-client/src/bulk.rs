//! 批量接口的换行分隔请求体。
//!
//! # 设计背景（Why）
//! - 批量接口要求每个操作占一行，且整个请求体必须以换行结尾，否则服务端会拒绝最后一个操作；
//! - 调用方既可能传入待序列化的值，也可能传入已经拼好的行文本，两种输入都要得到同样的结尾保证。
//!
//! # 契约说明（What）
//! - 各项按给定编解码器序列化，以单个 `\n` 连接，末尾补一个 `\n`；
//! - [`BulkItem::Raw`] 不再经过编解码器，只去掉自带的一个结尾换行，避免产生空行；
//! - 整体已是原始字节时由 [`bulk_raw`] 处理，只在缺少结尾换行时追加。

use bytes::{BufMut, Bytes, BytesMut};
use sift_codec::{Codec, Result, Value};
use tracing::debug;

const NEWLINE: u8 = b'\n';

/// 批量请求体中的一行。
#[derive(Clone, Debug, PartialEq)]
pub enum BulkItem {
    /// 需要序列化的值。
    Value(Value),
    /// 调用方已序列化好的一行；自带的结尾换行会被去掉，由拼接统一补齐。
    Raw(Bytes),
}

impl From<Value> for BulkItem {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&'static str> for BulkItem {
    fn from(line: &'static str) -> Self {
        Self::Raw(Bytes::from_static(line.as_bytes()))
    }
}

impl From<String> for BulkItem {
    fn from(line: String) -> Self {
        Self::Raw(Bytes::from(line))
    }
}

/// 用 `codec` 序列化 `items` 并拼成换行分隔的请求体。
///
/// 任一项编码失败时整体失败，错误原样返回。
pub fn bulk_body<I>(codec: &dyn Codec, items: I) -> Result<Bytes>
where
    I: IntoIterator,
    I::Item: Into<BulkItem>,
{
    let mut body = BytesMut::new();
    let mut lines = 0usize;
    for item in items {
        if lines > 0 {
            body.put_u8(NEWLINE);
        }
        match item.into() {
            BulkItem::Value(value) => body.extend_from_slice(&codec.encode(&value)?),
            BulkItem::Raw(raw) => {
                body.extend_from_slice(raw.strip_suffix(&[NEWLINE]).unwrap_or(&raw[..]))
            }
        }
        lines += 1;
    }
    body.put_u8(NEWLINE);

    debug!(
        codec = codec.descriptor().name(),
        lines,
        bytes = body.len(),
        "built bulk body"
    );
    Ok(body.freeze())
}

/// 已拼好的原始请求体：只保证结尾换行。
pub fn bulk_raw(body: impl Into<Bytes>) -> Bytes {
    let body = body.into();
    if body.last() == Some(&NEWLINE) {
        return body;
    }
    let mut terminated = BytesMut::with_capacity(body.len() + 1);
    terminated.extend_from_slice(&body);
    terminated.put_u8(NEWLINE);
    terminated.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_codec::{CodecError, JsonCodec, TextCodec, codes};

    #[test]
    fn values_are_joined_and_terminated() {
        let codec = JsonCodec::new();
        let body = bulk_body(
            &codec,
            [
                Value::object([("index", Value::object([("_id", Value::from(1i64))]))]),
                Value::object([("title", Value::from("rust"))]),
            ],
        )
        .expect("json items");
        assert_eq!(&body[..], b"{\"index\":{\"_id\":1}}\n{\"title\":\"rust\"}\n");
    }

    #[test]
    fn raw_lines_pass_through() {
        let codec = JsonCodec::new();
        let body = bulk_body(
            &codec,
            [
                BulkItem::from(r#"{"delete":{"_id":"7"}}"#),
                BulkItem::Value(Value::object([("create", Value::object::<&str, _>([]))])),
            ],
        )
        .expect("mixed items");
        assert_eq!(&body[..], b"{\"delete\":{\"_id\":\"7\"}}\n{\"create\":{}}\n");
    }

    #[test]
    fn raw_lines_with_their_own_newline_are_not_doubled() {
        let body = bulk_body(
            &JsonCodec::new(),
            [
                BulkItem::from("{\"index\":{}}\n"),
                BulkItem::from("{\"n\":1}\n"),
            ],
        )
        .expect("raw lines");
        assert_eq!(&body[..], b"{\"index\":{}}\n{\"n\":1}\n");
    }

    #[test]
    fn empty_input_is_a_single_newline() {
        let body = bulk_body(&JsonCodec::new(), Vec::<BulkItem>::new()).expect("no items");
        assert_eq!(&body[..], b"\n");
    }

    #[test]
    fn encoding_failure_aborts_the_body() {
        let err = bulk_body(&TextCodec::new(), [Value::from("ok"), Value::from(1i64)])
            .expect_err("text codec rejects numbers");
        assert_eq!(err.code(), codes::UNENCODABLE_VALUE);
        assert!(matches!(err, CodecError::UnencodableValue { .. }));
    }

    #[test]
    fn raw_bodies_gain_exactly_one_newline() {
        assert_eq!(&bulk_raw("a\nb")[..], b"a\nb\n");
        assert_eq!(&bulk_raw("a\nb\n")[..], b"a\nb\n");
        assert_eq!(&bulk_raw(Bytes::new())[..], b"\n");
    }
}
