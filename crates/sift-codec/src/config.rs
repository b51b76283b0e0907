//! 编解码层的启动配置。
//!
//! # 设计背景（Why）
//! - 进程内不存在全局默认注册表；默认类型、兼容模式等选项通过显式配置在客户端启动时传入分发器构造。
//! - 配置可由调用方直接构造，也可从 TOML 片段加载，便于与宿主应用的配置文件合并。
//!
//! # 契约说明（What）
//! - 所有字段都有默认值，空文档等价于 [`SerializerConfig::default`]；
//! - 配置本身不做语义校验，默认类型是否可解析在分发器构造时检查。

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::mime::APPLICATION_JSON;

/// 分发器配置。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerializerConfig {
    /// 响应头缺失或为通配符时使用的类型。
    pub default_mime_type: String,
    /// 额外注册 `application/vnd.elasticsearch+json`，按 JSON 解码兼容模式响应。
    pub compatibility_mode: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            default_mime_type: APPLICATION_JSON.to_owned(),
            compatibility_mode: false,
        }
    }
}

impl SerializerConfig {
    /// 从 TOML 文本加载。
    ///
    /// ```
    /// use sift_codec::SerializerConfig;
    ///
    /// let config = SerializerConfig::from_toml_str("default_mime_type = \"text/plain\"").unwrap();
    /// assert_eq!(config.default_mime_type, "text/plain");
    /// assert!(!config.compatibility_mode);
    /// ```
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw)
            .map_err(|err| CodecError::configuration(format!("invalid serializer config: {err}")))
    }

    /// 替换默认类型。
    pub fn with_default_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.default_mime_type = mime_type.into();
        self
    }

    /// 开关兼容模式。
    pub fn with_compatibility_mode(mut self, enabled: bool) -> Self {
        self.compatibility_mode = enabled;
        self
    }
}
