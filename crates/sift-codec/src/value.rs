//! 编解码层的内存值模型。
//!
//! # 设计背景（Why）
//! - 请求体需要表达“纯 JSON 的超集”：日期时间、定点小数、UUID、集合、数值数组与表格都可能出现在查询里，
//!   编码端不能丢失这些类型信息；
//! - 解码端只返回通用结构（字符串、数字、映射、序列、原始字节），不重建具体类型。
//!   日期编码为 ISO-8601 字符串后，解码回来仍是字符串，这种不对称是有意保留的。
//!
//! # 契约说明（What）
//! - `Null`/`Bool`/`Number`/`String`/`Array`/`Object` 为 JSON 原生值；
//! - `Bytes` 供二进制编解码器使用，JSON 编码器不认识它；
//! - 其余变体为扩展类型，由 JSON 编码器的扩展转换表处理；
//! - `Opaque` 承载任意 Rust 值，只能依靠调用方提供的回退钩子编码。

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rust_decimal::Decimal;
use serde_json::Number;
use uuid::Uuid;

/// 编解码层流转的值。
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// JSON `null`。
    Null,
    /// 布尔值。
    Bool(bool),
    /// JSON 数字。
    Number(Number),
    /// UTF-8 文本。
    String(String),
    /// 原始字节。
    Bytes(Bytes),
    /// 有序序列。
    Array(Vec<Value>),
    /// 字符串键映射。
    Object(BTreeMap<String, Value>),
    /// 日期、时间或日期时间。
    Temporal(Temporal),
    /// 定点小数。
    Decimal(Decimal),
    /// 唯一标识符。
    Uuid(Uuid),
    /// 去重集合。
    Set(ValueSet),
    /// 同构数值数组。
    NdArray(NumericArray),
    /// 按列组织的表格。
    Table(Table),
    /// 无法识别的 Rust 值。
    Opaque(Opaque),
}

impl Value {
    /// 由键值对构造映射。
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// 由元素构造序列。
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    /// 由元素构造集合，重复元素只保留首次出现。
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(items.into_iter().collect())
    }

    /// 包装原始字节。
    pub fn bytes(raw: impl Into<Bytes>) -> Self {
        Self::Bytes(raw.into())
    }

    /// 包装任意 Rust 值。
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(Opaque::new(value))
    }

    /// 诊断用的类型名；`Opaque` 返回被包装值的 Rust 类型名。
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Temporal(temporal) => temporal.type_name(),
            Self::Decimal(_) => "decimal",
            Self::Uuid(_) => "uuid",
            Self::Set(_) => "set",
            Self::NdArray(_) => "ndarray",
            Self::Table(_) => "table",
            Self::Opaque(opaque) => opaque.type_name(),
        }
    }

    /// 文本视图。
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// 字节视图。
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(raw) => Some(raw),
            _ => None,
        }
    }

    /// 整数视图。
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    /// 按键读取映射成员。
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for Value {
    /// 非有限浮点数无法用 JSON 数字表示，映射为 `null`。
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Temporal(Temporal::Date(value))
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Self::Temporal(Temporal::Time(value))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Temporal(Temporal::DateTime(value))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Temporal(Temporal::Zoned(value.fixed_offset()))
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<ValueSet> for Value {
    fn from(value: ValueSet) -> Self {
        Self::Set(value)
    }
}

impl From<NumericArray> for Value {
    fn from(value: NumericArray) -> Self {
        Self::NdArray(value)
    }
}

impl From<Table> for Value {
    fn from(value: Table) -> Self {
        Self::Table(value)
    }
}

/// 日期时间扩展类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Temporal {
    /// 仅日期。
    Date(NaiveDate),
    /// 仅时间。
    Time(NaiveTime),
    /// 不带时区的日期时间。
    DateTime(NaiveDateTime),
    /// 带固定偏移的日期时间。
    Zoned(DateTime<FixedOffset>),
}

impl Temporal {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) | Self::Zoned(_) => "datetime",
        }
    }
}

/// 保持插入顺序的去重集合。
///
/// 编码时按插入顺序输出；同一进程内多次编码的结果一致。
#[derive(Clone, Debug, Default)]
pub struct ValueSet(Vec<Value>);

impl ValueSet {
    /// 空集合。
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入元素，已存在时返回 `false`。
    pub fn insert(&mut self, value: Value) -> bool {
        if self.0.contains(&value) {
            return false;
        }
        self.0.push(value);
        true
    }

    /// 是否包含元素。
    pub fn contains(&self, value: &Value) -> bool {
        self.0.contains(value)
    }

    /// 按插入顺序迭代。
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    /// 元素个数。
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for ValueSet {
    // 集合相等与插入顺序无关。
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

/// 数值数组的扁平存储。
#[derive(Clone, Debug, PartialEq)]
pub enum NumericData {
    /// 整数元素。
    Int(Vec<i64>),
    /// 浮点元素。
    Float(Vec<f64>),
}

impl NumericData {
    fn len(&self) -> usize {
        match self {
            Self::Int(data) => data.len(),
            Self::Float(data) => data.len(),
        }
    }
}

/// 行优先存储的同构数值数组，支持任意维度。
///
/// # 契约说明（What）
/// - `shape` 各维长度之积必须等于元素个数，构造时校验；
/// - 零维数组（`shape` 为空）恰好持有一个元素，编码为标量。
#[derive(Clone, Debug, PartialEq)]
pub struct NumericArray {
    shape: Vec<usize>,
    data: NumericData,
}

impl NumericArray {
    /// 按形状展开时任一层允许的最大单元数（子数组或元素）。
    pub const MAX_CELLS: usize = 1 << 24;

    /// 按形状构造；元素个数与形状不符，或任一层展开后的单元数超过
    /// [`NumericArray::MAX_CELLS`] 时返回 `None`。
    ///
    /// 某一维为零后，其后各维不再展开，长度不受上限约束。
    pub fn from_shape(shape: Vec<usize>, data: NumericData) -> Option<Self> {
        let mut cells = 1usize;
        for &dim in &shape {
            cells = cells.checked_mul(dim)?;
            if cells > Self::MAX_CELLS {
                return None;
            }
            if cells == 0 {
                break;
            }
        }
        (cells == data.len()).then_some(Self { shape, data })
    }

    /// 一维整数数组。
    pub fn from_ints(data: Vec<i64>) -> Self {
        Self {
            shape: vec![data.len()],
            data: NumericData::Int(data),
        }
    }

    /// 一维浮点数组。
    pub fn from_floats(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data: NumericData::Float(data),
        }
    }

    /// 各维长度。
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// 扁平元素。
    pub fn data(&self) -> &NumericData {
        &self.data
    }
}

/// 按列组织的表格值，列顺序即插入顺序。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<(String, Vec<Value>)>,
}

impl Table {
    /// 空表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一列；同名列会被替换。
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        let name = name.into();
        let values: Vec<Value> = values.into_iter().collect();
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = values,
            None => self.columns.push((name, values)),
        }
        self
    }

    /// 迭代列。
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

/// 类型擦除的任意值，只能经由回退钩子编码。
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    /// 包装值并记录其类型名。
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// 被包装值的 Rust 类型名。
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 尝试还原为具体类型。
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Opaque").field(&self.type_name).finish()
    }
}
