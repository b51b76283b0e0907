//! MIME 类型解析与比较。
//!
//! # 设计背景（Why）
//! - 服务端返回的 `Content-Type` 头格式千差万别：大小写混用、携带 `charset`、重复参数、甚至一次给出多个类型；
//!   选择编解码器之前必须先把它们规整为稳定的 `type/subtype` 主体。
//! - 参数只用于后续可能的字符集处理，不参与编解码器的选择，因此解析结果把主体与参数分开存放。
//!
//! # 契约说明（What）
//! - 主体比较忽略大小写，参数比较忽略顺序；
//! - `type/*` 与 `*/*` 是合法的匹配模式，但不能作为编解码器的声明类型；
//! - 解析是宽松的：缺少 `=` 的参数段被忽略，重复键以最后一次出现为准。

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// 纯文本编解码器的声明类型。
pub const TEXT_PLAIN: &str = "text/plain";
/// 结构化 JSON 编解码器的声明类型。
pub const APPLICATION_JSON: &str = "application/json";
/// 二进制矢量瓦片编解码器的声明类型。
pub const MAPBOX_VECTOR_TILE: &str = "application/vnd.mapbox-vector-tile";
/// 服务端兼容模式下返回的厂商 JSON 类型。
pub const COMPATIBILITY_JSON: &str = "application/vnd.elasticsearch+json";
/// 批量请求使用的换行分隔 JSON 类型。
pub const APPLICATION_NDJSON: &str = "application/x-ndjson";

const WILDCARD: &str = "*";
const COMPATIBLE_WITH: &str = "compatible-with";

/// 无法解析的 MIME 字符串。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("`{raw}` is not a valid media type: {reason}")]
pub struct MimeParseError {
    raw: String,
    reason: &'static str,
}

impl MimeParseError {
    fn new(raw: &str, reason: &'static str) -> Self {
        Self {
            raw: raw.to_owned(),
            reason,
        }
    }

    /// 返回原始输入。
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// 结构化的 MIME 类型：`type/subtype` 主体加有序参数表。
///
/// # 逻辑解析（How）
/// - `type` 与 `subtype` 在解析时统一转为小写；
/// - 参数键转为小写，值去除首尾空白与成对双引号；参数存放于 `BTreeMap`，
///   因此 `PartialEq` 天然忽略参数书写顺序。
///
/// # 风险提示（Trade-offs）
/// - 不校验 RFC 6838 的字符集限制，仅拒绝空段、内部空白以及 `*/subtype` 这类无意义模式。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MimeType {
    type_: String,
    subtype: String,
    params: BTreeMap<String, String>,
}

impl MimeType {
    /// 解析一个 `Content-Type` 风格的字符串。
    ///
    /// 多个以逗号分隔的类型只取第一个。
    pub fn parse(raw: &str) -> Result<Self, MimeParseError> {
        let first = raw.split(',').next().unwrap_or_default();
        let mut segments = first.split(';');
        let essence = segments.next().unwrap_or_default().trim();
        if essence.is_empty() {
            return Err(MimeParseError::new(raw, "empty media type"));
        }

        let (type_, subtype) = essence
            .split_once('/')
            .ok_or_else(|| MimeParseError::new(raw, "missing `/` separator"))?;
        let (type_, subtype) = (type_.trim(), subtype.trim());
        if type_.is_empty() || subtype.is_empty() {
            return Err(MimeParseError::new(raw, "empty type or subtype"));
        }
        if subtype.contains('/') || essence.contains(char::is_whitespace) {
            return Err(MimeParseError::new(raw, "malformed type/subtype"));
        }
        if type_ == WILDCARD && subtype != WILDCARD {
            return Err(MimeParseError::new(raw, "wildcard type with concrete subtype"));
        }

        let mut params = BTreeMap::new();
        for segment in segments {
            let Some((key, value)) = segment.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
                .unwrap_or(value);
            params.insert(key, value.to_owned());
        }

        Ok(Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
        })
    }

    /// 以已知合法的小写常量构造类型，跳过解析。
    pub(crate) fn concrete(type_: &str, subtype: &str) -> Self {
        Self {
            type_: type_.to_owned(),
            subtype: subtype.to_owned(),
            params: BTreeMap::new(),
        }
    }

    /// 主类型，例如 `application`。
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// 子类型，例如 `json`。
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// `type/subtype` 主体，编解码器选择只看这一部分。
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// 按键读取参数，键不区分大小写。
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 迭代全部参数（按键排序）。
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `charset` 参数。
    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    /// 兼容模式头携带的 `compatible-with` 主版本号。
    pub fn compatible_with(&self) -> Option<u32> {
        self.param(COMPATIBLE_WITH)?.parse().ok()
    }

    /// 是否为 `type/*` 或 `*/*` 模式。
    pub fn is_wildcard(&self) -> bool {
        self.type_ == WILDCARD || self.subtype == WILDCARD
    }

    /// 丢弃参数后的副本。
    pub fn without_params(&self) -> Self {
        Self::concrete(&self.type_, &self.subtype)
    }

    /// 判断 `self` 作为匹配模式时是否覆盖 `other`。
    ///
    /// 解析器不使用这一能力做模糊匹配；它仅供调用方检查 `Accept` 之类的声明。
    pub fn matches(&self, other: &MimeType) -> bool {
        let type_ok = self.type_ == WILDCARD || self.type_ == other.type_;
        let subtype_ok = self.subtype == WILDCARD || self.subtype == other.subtype;
        type_ok && subtype_ok
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (key, value) in &self.params {
            write!(f, "; {key}={value}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for MimeType {
    type Err = MimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_params() {
        let mime = MimeType::parse("Application/JSON; Charset=\"UTF-8\"").expect("valid");
        assert_eq!(mime.essence(), "application/json");
        assert_eq!((mime.type_(), mime.subtype()), ("application", "json"));
        assert_eq!(mime.charset(), Some("UTF-8"));
        assert_eq!(mime.to_string(), "application/json; charset=UTF-8");
    }

    #[test]
    fn parameter_order_does_not_affect_equality() {
        let a = MimeType::parse("text/plain; a=1; b=2").expect("valid");
        let b = MimeType::parse("text/plain;b=2;a=1").expect("valid");
        assert_eq!(a, b);
    }

    #[test]
    fn later_duplicate_parameters_win() {
        let mime = MimeType::parse("text/plain; charset=latin1; charset=utf-8").expect("valid");
        assert_eq!(mime.charset(), Some("utf-8"));
        assert_eq!(mime.params().count(), 1);
    }

    #[test]
    fn only_first_of_several_types_is_honoured() {
        let mime = MimeType::parse("text/plain, application/json").expect("valid");
        assert_eq!(mime.essence(), "text/plain");
    }

    #[test]
    fn segments_without_equals_are_ignored() {
        let mime = MimeType::parse("application/json; garbage; q=0.5").expect("valid");
        assert_eq!(mime.params().collect::<Vec<_>>(), vec![("q", "0.5")]);
    }

    #[test]
    fn wildcards_are_recognised() {
        assert!(MimeType::parse("*/*").expect("valid").is_wildcard());
        assert!(MimeType::parse("application/*").expect("valid").is_wildcard());
        assert!(!MimeType::parse(APPLICATION_JSON).expect("valid").is_wildcard());
        assert!(MimeType::parse("*/json").is_err());
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        for raw in ["", "   ", "json", "/json", "application/", "a/b/c", "app lication/json"] {
            assert!(MimeType::parse(raw).is_err(), "`{raw}` should not parse");
        }
    }

    #[test]
    fn compatible_with_parameter_is_exposed() {
        let mime =
            MimeType::parse("application/vnd.elasticsearch+json; compatible-with=8").expect("ok");
        assert_eq!(mime.compatible_with(), Some(8));
        assert_eq!(mime.essence(), COMPATIBILITY_JSON);
    }

    #[test]
    fn pattern_matching_covers_subtypes() {
        let pattern = MimeType::parse("application/*").expect("valid");
        let json = MimeType::parse(APPLICATION_JSON).expect("valid");
        let text = MimeType::parse(TEXT_PLAIN).expect("valid");
        assert!(pattern.matches(&json));
        assert!(!pattern.matches(&text));
        assert!(MimeType::parse("*/*").expect("valid").matches(&text));
    }
}
