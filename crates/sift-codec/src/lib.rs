#![warn(missing_docs)]

//! `sift-codec` 是搜索引擎 HTTP 客户端的内容类型编解码层。
//!
//! # 设计背景（Why）
//! - 传输层只搬运字节；请求体与响应体在客户端值与字节之间的转换，集中由本 crate 承担；
//! - 服务端可能返回 JSON、纯文本或二进制矢量瓦片，解码前必须依据 `Content-Type` 选出正确实现。
//!
//! # 使用概览（How）
//! - [`Dispatcher`] 是解码入口：构造时传入覆盖项与默认类型，之后以响应体和响应头调用 `decode`；
//! - 编码侧通过 [`Dispatcher::registry`] 按目标类型查找 [`Codec`] 后调用 `encode`；
//! - 启动配置可用 [`SerializerConfig`] 从 TOML 加载，再交给 [`DispatcherBuilder::config`]。
//!
//! ```
//! use sift_codec::{Dispatcher, Value};
//!
//! let dispatcher = Dispatcher::with_builtins()?;
//! let value = dispatcher.decode(br#"{"took":3}"#, Some("application/json; charset=utf-8"))?;
//! assert_eq!(value.get("took").and_then(Value::as_i64), Some(3));
//! # Ok::<(), sift_codec::CodecError>(())
//! ```
//!
//! # 合约说明（What）
//! - 注册表在构造完成后只读，分发器可以跨线程共享；
//! - 所有错误统一为 [`CodecError`]，并通过 [`codes`] 暴露稳定错误码。
//!
//! # 风险提示（Trade-offs）
//! - 响应头为通配符时直接回退到默认类型，而不是做内容协商。

mod codec;
mod config;
mod dispatcher;
mod error;
mod mime;
mod registry;
mod resolver;
mod value;

pub use crate::codec::{Codec, CodecDescriptor, FallbackHook, JsonCodec, TextCodec, TileCodec};
pub use crate::config::SerializerConfig;
pub use crate::dispatcher::{Dispatcher, DispatcherBuilder};
pub use crate::error::{BoxError, CodecError, Result, codes};
pub use crate::mime::{
    APPLICATION_JSON, APPLICATION_NDJSON, COMPATIBILITY_JSON, MAPBOX_VECTOR_TILE, MimeParseError,
    MimeType, TEXT_PLAIN,
};
pub use crate::registry::CodecRegistry;
pub use crate::resolver::{ContentTypeResolver, ResolutionSource, ResolvedCodec};
pub use crate::value::{NumericArray, NumericData, Opaque, Table, Temporal, Value, ValueSet};
