#![warn(missing_docs)]

//! `sift-client` 把编解码层接到搜索引擎客户端的请求/响应边界上。
//!
//! # 使用概览（How）
//! - 启动时构造一次 [`ClientSerializers`]，之后用 `decode_response` 解码响应体、
//!   用 `encode_request` 得到请求体及其出站 `Content-Type`；
//! - 批量接口使用 [`ClientSerializers::encode_bulk`] 或更底层的 [`bulk_body`]、[`bulk_raw`]。
//!
//! 传输层本身不在本 crate 内：它只接收 [`EncodedRequest::into_parts`] 给出的头值与字节。

mod bulk;
mod serializers;

pub use crate::bulk::{BulkItem, bulk_body, bulk_raw};
pub use crate::serializers::{ClientSerializers, EncodedRequest};
