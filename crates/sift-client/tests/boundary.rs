//! 客户端边界的端到端用例：回退钩子、覆盖项转交、批量请求体结尾不变式。

use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;
use sift_client::{BulkItem, ClientSerializers, bulk_raw};
use sift_codec::{
    APPLICATION_JSON, Codec, Dispatcher, FallbackHook, TEXT_PLAIN, TextCodec, Value, codes,
};

#[derive(Debug)]
struct GeoPoint {
    lat: f64,
    lon: f64,
}

#[test]
fn fallback_hook_reaches_request_encoding() {
    let hook: FallbackHook = Arc::new(|value: &Value| match value {
        Value::Opaque(opaque) => opaque
            .downcast_ref::<GeoPoint>()
            .map(|p| serde_json::json!([p.lon, p.lat])),
        _ => None,
    });
    let dispatcher = Dispatcher::builder().fallback(hook).build().expect("hooked");
    let serializers = ClientSerializers::from_dispatcher(dispatcher);

    let point = Value::opaque(GeoPoint { lat: 52.5, lon: 13.25 });
    let request = serializers
        .encode_request(&Value::object([("location", point)]), None)
        .expect("hook encodes the point");
    assert_eq!(&request.body()[..], br#"{"location":[13.25,52.5]}"#);

    let err = serializers
        .encode_request(&Value::opaque(std::time::Duration::from_secs(1)), None)
        .expect_err("hook declines durations");
    assert_eq!(err.code(), codes::UNENCODABLE_VALUE);
}

#[test]
fn overrides_and_default_are_forwarded() {
    let serializers = ClientSerializers::new(
        [("text/csv", Arc::new(TextCodec::new()) as Arc<dyn Codec>)],
        TEXT_PLAIN,
    )
    .expect("csv override");
    assert_eq!(serializers.dispatcher().default_mime_type().essence(), TEXT_PLAIN);

    let csv = serializers
        .encode_request(&Value::from("id,title\n1,rust"), Some("text/csv; header=present"))
        .expect("csv body");
    // 覆盖项以 text/csv 为键，但出站类型取编解码器自己的声明类型。
    assert_eq!(csv.content_type().essence(), TEXT_PLAIN);
    assert_eq!(csv.content_type().param("header"), None);

    let decoded = serializers
        .decode_response(csv.body(), Some("text/csv"))
        .expect("csv decodes as text");
    assert_eq!(decoded.as_str(), Some("id,title\n1,rust"));

    let json = serializers
        .decode_response(br#"[1,2]"#, Some(APPLICATION_JSON))
        .expect("builtins stay registered");
    assert_eq!(json, Value::array([Value::from(1i64), Value::from(2i64)]));
}

proptest! {
    #[test]
    fn bulk_bodies_always_end_with_one_newline(
        lines in prop::collection::vec("[a-z{}\":,]{0,12}", 0..8),
    ) {
        let serializers = ClientSerializers::from_config(Default::default()).expect("builtins");
        let expected_lines = lines.len();
        let request = serializers
            .encode_bulk(lines.into_iter().map(BulkItem::from))
            .expect("raw lines never fail");
        let body = request.body();
        prop_assert_eq!(body.last(), Some(&b'\n'));
        prop_assert_eq!(body.iter().filter(|b| **b == b'\n').count(), expected_lines.max(1));

        let raw = bulk_raw(body.clone());
        prop_assert_eq!(&raw, body);
    }

    #[test]
    fn raw_bodies_are_terminated(text in "[a-z\n]{0,32}") {
        let raw = bulk_raw(Bytes::from(text.clone()));
        prop_assert_eq!(raw.last(), Some(&b'\n'));
        prop_assert_eq!(&raw[..text.len()], text.as_bytes());
        prop_assert!(raw.len() == text.len() || raw.len() == text.len() + 1);
    }
}
