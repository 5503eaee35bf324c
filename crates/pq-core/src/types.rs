//! Dynamic value model
//!
//! Entities expose their fields as [`Value`]s tagged with a static
//! [`ValueType`]. Literals from a filter specification are coerced into the
//! same model at compile time, so comparisons at evaluation time only ever
//! see two values of compatible categories.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Static description of an enumeration: its name and variant names in
/// declaration order. Variants are addressed by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumDef {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

impl EnumDef {
    pub const fn new(name: &'static str, variants: &'static [&'static str]) -> Self {
        Self { name, variants }
    }

    /// Parse a variant by name (case-insensitive)
    pub fn parse(&self, name: &str) -> Option<u32> {
        self.variants
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
            .map(|i| i as u32)
    }

    /// Get the variant name for an ordinal
    pub fn variant(&self, ordinal: u32) -> Option<&'static str> {
        self.variants.get(ordinal as usize).copied()
    }

    pub fn contains(&self, ordinal: u32) -> bool {
        (ordinal as usize) < self.variants.len()
    }
}

/// Static type of a property as declared by an entity schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    String,
    Uuid,
    Date,
    DateTime,
    Enum(EnumDef),
    /// A related entity, only usable for existence checks
    Record(&'static str),
    /// A collection of values of the element type
    List(Box<ValueType>),
}

/// Comparison category of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Bool,
    Numeric,
    String,
    Uuid,
    Temporal,
    Enum,
    Record,
    Collection,
}

impl ValueType {
    pub fn list(element: ValueType) -> Self {
        Self::List(Box::new(element))
    }

    /// Element type of a collection
    pub fn element(&self) -> Option<&ValueType> {
        match self {
            Self::List(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }

    pub fn category(&self) -> TypeCategory {
        match self {
            Self::Bool => TypeCategory::Bool,
            Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64 | Self::Decimal => {
                TypeCategory::Numeric
            }
            Self::String => TypeCategory::String,
            Self::Uuid => TypeCategory::Uuid,
            Self::Date | Self::DateTime => TypeCategory::Temporal,
            Self::Enum(_) => TypeCategory::Enum,
            Self::Record(_) => TypeCategory::Record,
            Self::List(_) => TypeCategory::Collection,
        }
    }

    /// Whether values of this type have a meaningful ordering
    pub fn is_ordered(&self) -> bool {
        matches!(
            self.category(),
            TypeCategory::Numeric | TypeCategory::String | TypeCategory::Temporal | TypeCategory::Enum
        )
    }

    /// Whether two property types can be compared directly, without coercion
    pub fn is_comparable_with(&self, other: &ValueType) -> bool {
        match (self, other) {
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Record(_), _) | (_, Self::Record(_)) => false,
            (Self::List(_), _) | (_, Self::List(_)) => false,
            _ => self.category() == other.category(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int32 => f.write_str("int32"),
            Self::Int64 => f.write_str("int64"),
            Self::Float32 => f.write_str("float32"),
            Self::Float64 => f.write_str("float64"),
            Self::Decimal => f.write_str("decimal"),
            Self::String => f.write_str("string"),
            Self::Uuid => f.write_str("uuid"),
            Self::Date => f.write_str("date"),
            Self::DateTime => f.write_str("datetime"),
            Self::Enum(def) => write!(f, "enum {}", def.name),
            Self::Record(name) => write!(f, "record {}", name),
            Self::List(element) => write!(f, "list<{}>", element),
        }
    }
}

/// A property value read from an entity, or a coerced literal
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    String(Cow<'a, str>),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    /// Enum variant ordinal
    Enum(u32),
    /// Presence marker for a related entity
    Record,
    List(Vec<Value<'a>>),
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Decimal(Decimal),
    Float(f64),
}

impl<'a> Value<'a> {
    /// Build a list value from anything convertible into values
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value<'a>>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build an enum value from a variant ordinal
    pub fn enumeration(ordinal: impl Into<u32>) -> Self {
        Self::Enum(ordinal.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value<'a>]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Uuid(_) => "uuid",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Enum(_) => "enum",
            Self::Record => "record",
            Self::List(_) => "list",
        }
    }

    fn number(&self) -> Option<Number> {
        match self {
            Self::Int32(n) => Some(Number::Int(i64::from(*n))),
            Self::Int64(n) => Some(Number::Int(*n)),
            Self::Decimal(d) => Some(Number::Decimal(*d)),
            Self::Float32(n) => Some(Number::Float(f64::from(*n))),
            Self::Float64(n) => Some(Number::Float(*n)),
            _ => None,
        }
    }

    /// Compare two values of the same category.
    ///
    /// Numbers compare across widths. Values of different categories, nulls,
    /// records and lists are unordered and yield `None`.
    pub fn compare(&self, other: &Value<'_>) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.number(), other.number()) {
            return compare_numbers(a, b);
        }
        match (self, other) {
            (Self::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Self::String(a), Value::String(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Self::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Self::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Self::Date(a), Value::DateTime(b)) => Some(midnight(a).cmp(b)),
            (Self::DateTime(a), Value::Date(b)) => Some(a.cmp(&midnight(b))),
            (Self::Enum(a), Value::Enum(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting: nulls first, then by value.
    ///
    /// Numbers of every width share one order in which NaN sorts above all
    /// other numbers (below them when its sign bit is set). Other values that
    /// [`Value::compare`] cannot order fall back to their kind so that the
    /// order stays total.
    pub fn sort_cmp(&self, other: &Value<'_>) -> Ordering {
        match (self, other) {
            (Self::Null, Value::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => match (self.number(), other.number()) {
                (Some(a), Some(b)) => compare_numbers(a, b).unwrap_or_else(|| nan_rank(a).cmp(&nan_rank(b))),
                _ => self
                    .compare(other)
                    .unwrap_or_else(|| self.kind().cmp(other.kind())),
            },
        }
    }
}

fn midnight(date: &NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Position of a NaN relative to ordinary numbers
fn nan_rank(n: Number) -> i8 {
    match n {
        Number::Float(f) if f.is_nan() && f.is_sign_negative() => -1,
        Number::Float(f) if f.is_nan() => 1,
        _ => 0,
    }
}

fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
        (Number::Decimal(a), Number::Decimal(b)) => Some(a.cmp(&b)),
        (Number::Int(a), Number::Decimal(b)) => Some(Decimal::from(a).cmp(&b)),
        (Number::Decimal(a), Number::Int(b)) => Some(a.cmp(&Decimal::from(b))),
        (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b),
        (Number::Int(a), Number::Float(b)) => (a as f64).partial_cmp(&b),
        (Number::Float(a), Number::Int(b)) => a.partial_cmp(&(b as f64)),
        (Number::Decimal(a), Number::Float(b)) => match Decimal::from_f64(b) {
            Some(b) => Some(a.cmp(&b)),
            None => a.to_f64()?.partial_cmp(&b),
        },
        (Number::Float(a), Number::Decimal(b)) => match Decimal::from_f64(a) {
            Some(a) => Some(a.cmp(&b)),
            None => a.partial_cmp(&b.to_f64()?),
        },
    }
}

impl PartialEq<Value<'_>> for Value<'_> {
    fn eq(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Self::Null, Value::Null) | (Self::Record, Value::Record) => true,
            (Self::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value<'_> {
    fn from(n: i32) -> Self {
        Self::Int32(n)
    }
}

impl From<i64> for Value<'_> {
    fn from(n: i64) -> Self {
        Self::Int64(n)
    }
}

impl From<f32> for Value<'_> {
    fn from(n: f32) -> Self {
        Self::Float32(n)
    }
}

impl From<f64> for Value<'_> {
    fn from(n: f64) -> Self {
        Self::Float64(n)
    }
}

impl From<Decimal> for Value<'_> {
    fn from(d: Decimal) -> Self {
        Self::Decimal(d)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Self::String(Cow::Borrowed(s))
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(s: &'a String) -> Self {
        Self::String(Cow::Borrowed(s.as_str()))
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Self::String(Cow::Owned(s))
    }
}

impl From<Uuid> for Value<'_> {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<NaiveDate> for Value<'_> {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<DateTime<Utc>> for Value<'_> {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}

impl<'a, V: Into<Value<'a>>> From<Option<V>> for Value<'a> {
    fn from(value: Option<V>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
