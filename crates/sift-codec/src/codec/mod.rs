//! `codec` 模块定义单个编解码器的契约与内置实现。
//!
//! # 模块设计（Why）
//! - 每个编解码器只服务一个具体 MIME 类型：声明类型、编码函数、解码函数三者不可变地绑定在一起；
//! - 注册表以 `Arc<dyn Codec>` 存放实现，因此契约必须对象安全，且实现本身无内部可变状态。
//!
//! # 使用指引（How）
//! - 内置实现：[`TextCodec`]（`text/plain`）、[`JsonCodec`]（`application/json`）、
//!   [`TileCodec`]（`application/vnd.mapbox-vector-tile`）；
//! - 自定义实现只需提供 [`CodecDescriptor`] 并实现 [`Codec`]，再在构造分发器时作为覆盖项传入。
//!
//! # 契约说明（What）
//! - `encode` 对同一输入是确定性的，且不修改输入；
//! - `decode` 遇到格式错误返回 `MalformedPayload`，并保留底层解析错误；
//! - 往返不保证类型对称，只保证编解码器原生可表达的值能还原。

mod json;
mod text;
mod tile;

use std::borrow::Cow;

use bytes::Bytes;

use crate::error::{CodecError, Result};
use crate::mime::MimeType;
use crate::value::Value;

pub use json::{FallbackHook, JsonCodec};
pub use text::TextCodec;
pub use tile::TileCodec;

/// `CodecDescriptor` 记录编解码器的名称与声明类型。
///
/// # 设计背景（Why）
/// - 解析器按声明类型索引，请求构建方按声明类型设置出站 `Content-Type`，日志按名称标识实现；
///   把这些信息集中在一个不可变描述里，避免各处重复拼写。
///
/// # 契约说明（What）
/// - **不变式**：声明类型不含通配符，构造时校验；
/// - **后置条件**：实例可自由克隆并跨线程共享。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecDescriptor {
    name: Cow<'static, str>,
    mime_type: MimeType,
}

impl CodecDescriptor {
    /// 构建描述符；声明类型为通配符时返回配置错误。
    pub fn new(name: impl Into<Cow<'static, str>>, mime_type: MimeType) -> Result<Self> {
        if mime_type.is_wildcard() {
            return Err(CodecError::configuration(format!(
                "codec cannot declare wildcard media type `{mime_type}`"
            )));
        }
        Ok(Self {
            name: name.into(),
            mime_type,
        })
    }

    pub(crate) fn builtin(name: &'static str, type_: &str, subtype: &str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            mime_type: MimeType::concrete(type_, subtype),
        }
    }

    /// 实现名称，用于日志。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明的 MIME 类型。
    pub fn mime_type(&self) -> &MimeType {
        &self.mime_type
    }
}

/// `Codec` 同时封装编码与解码能力。
///
/// # 契约说明（What）
/// - **前置条件**：实现者需保证 `Send + Sync + 'static`，注册表会在任意请求线程上并发调用；
/// - **后置条件**：两个方法都是输入的纯函数，不做 I/O，不挂起，耗时与负载大小成正比。
pub trait Codec: Send + Sync + 'static {
    /// 返回该编解码器的描述符。
    fn descriptor(&self) -> &CodecDescriptor;

    /// 把值编码为线上字节。
    fn encode(&self, value: &Value) -> Result<Bytes>;

    /// 把线上字节解码为通用结构。
    fn decode(&self, raw: &[u8]) -> Result<Value>;

    /// 声明类型的便捷访问。
    fn mime_type(&self) -> &MimeType {
        self.descriptor().mime_type()
    }
}
