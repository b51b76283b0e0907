//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 编解码层的失败只有四类：找不到编解码器、负载格式错误、值无法编码、启动配置错误；
//!   集中定义后，传输层可以按类别决定是否上报或中止启动。
//! - 每个变体都映射到稳定错误码，日志与告警系统据此聚合，而不必解析自然语言消息。
//!
//! ## 设计要求（What）
//! - 本层不做任何本地恢复或重试，所有错误原样上抛；
//! - `MalformedPayload` 通过 `#[source]` 保留底层解析错误，调用方可沿 `source()` 链排障；
//! - 错误值不共享可变状态，一次解码失败不会影响其他并发调用。

use std::borrow::Cow;
use std::error::Error as StdError;

use thiserror::Error;

/// 稳定错误码常量，遵循 `<域>.<语义>` 命名约定。
pub mod codes {
    /// 解析器找不到匹配的编解码器。
    pub const UNSUPPORTED_MEDIA_TYPE: &str = "codec.unsupported_media_type";
    /// 负载不符合编解码器自身的格式规则。
    pub const MALFORMED_PAYLOAD: &str = "codec.malformed_payload";
    /// 值既不是原生类型，也没有扩展转换或回退钩子可用。
    pub const UNENCODABLE_VALUE: &str = "codec.unencodable_value";
    /// 注册表或分发器的启动配置非法。
    pub const CONFIGURATION: &str = "codec.configuration";
}

/// 底层解析错误的装箱形态。
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// 编解码层的统一错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把解析器、注册表与各编解码器的失败收敛为一个枚举，便于传输层直接 `?` 传播。
/// - **契约 (What)**：
///   - 所有变体均为 `Send + Sync + 'static`，可安全跨线程传递；
///   - [`CodecError::code`] 返回的码值在版本间保持稳定。
/// - **设计权衡 (Trade-offs)**：上下文字段使用 `String` 保存，牺牲少量分配换取可读的诊断信息。
#[derive(Debug, Error)]
pub enum CodecError {
    /// 没有精确匹配的编解码器，且请求类型不是可回退到默认类型的通配符。
    ///
    /// `known` 按字典序列出注册表中的全部类型，方便排查服务端返回了什么。
    #[error("unsupported media type `{requested}`, known types: [{}]", .known.join(", "))]
    UnsupportedMediaType {
        /// 请求的类型主体（或无法解析的原始头）。
        requested: String,
        /// 注册表中已知的类型。
        known: Vec<String>,
    },

    /// 编解码器无法按自身格式解析输入。
    #[error("malformed `{mime_type}` payload: {source}")]
    MalformedPayload {
        /// 负责解码的编解码器声明类型。
        mime_type: String,
        /// 原始解析错误。
        #[source]
        source: BoxError,
    },

    /// 值超出了原生类型与扩展类型的集合，且回退钩子缺失或同样失败。
    #[error("unable to encode value of type `{type_name}` as `{mime_type}`")]
    UnencodableValue {
        /// 出错值的类型名。
        type_name: Cow<'static, str>,
        /// 目标编解码器的声明类型。
        mime_type: String,
    },

    /// 启动期配置错误：默认类型不在注册表中、以通配符注册等。
    #[error("invalid codec configuration: {reason}")]
    Configuration {
        /// 人类可读的原因。
        reason: String,
    },
}

impl CodecError {
    /// 构造 `MalformedPayload`。
    pub fn malformed(
        mime_type: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::MalformedPayload {
            mime_type: mime_type.into(),
            source: Box::new(source),
        }
    }

    /// 构造 `UnencodableValue`。
    pub fn unencodable(
        type_name: impl Into<Cow<'static, str>>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self::UnencodableValue {
            type_name: type_name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// 构造 `Configuration`。
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedMediaType { .. } => codes::UNSUPPORTED_MEDIA_TYPE,
            Self::MalformedPayload { .. } => codes::MALFORMED_PAYLOAD,
            Self::UnencodableValue { .. } => codes::UNENCODABLE_VALUE,
            Self::Configuration { .. } => codes::CONFIGURATION,
        }
    }

    /// 是否为启动期配置错误。
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// 编解码层的 `Result` 别名。
pub type Result<T, E = CodecError> = std::result::Result<T, E>;
