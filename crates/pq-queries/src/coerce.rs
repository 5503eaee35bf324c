//! Literal Coercion
//!
//! Converts loosely-typed JSON literals into the exact [`ValueType`] of the
//! property they are compared with. Conversions are checked: a value that
//! does not fit its target fails instead of being truncated or wrapped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use pq_core::{QueryError, QueryResult, Value, ValueType};
use rust_decimal::Decimal;
use serde_json::{Number, Value as Json};
use std::str::FromStr;
use uuid::Uuid;

/// Coerce a literal to the target type. `null` always coerces to `Null`.
pub fn coerce(value: &Json, target: &ValueType) -> QueryResult<Value<'static>> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match target {
        ValueType::List(element) => coerce_list(value, element),
        ValueType::Enum(def) => {
            let ordinal = match value {
                Json::String(s) => def.parse(s.trim()).or_else(|| {
                    s.trim().parse::<u32>().ok().filter(|o| def.contains(*o))
                }),
                Json::Number(n) => n
                    .as_u64()
                    .and_then(|o| u32::try_from(o).ok())
                    .filter(|o| def.contains(*o)),
                _ => None,
            };
            ordinal.map(Value::Enum).ok_or_else(|| mismatch(value, target))
        }
        ValueType::Uuid => match value {
            Json::String(s) => Uuid::parse_str(s.trim())
                .map(Value::Uuid)
                .map_err(|_| mismatch(value, target)),
            _ => Err(mismatch(value, target)),
        },
        ValueType::Bool => coerce_bool(value).ok_or_else(|| mismatch(value, target)),
        ValueType::String => match value {
            Json::String(s) => Ok(Value::from(s.clone())),
            Json::Number(n) => Ok(Value::from(n.to_string())),
            Json::Bool(b) => Ok(Value::from(b.to_string())),
            _ => Err(mismatch(value, target)),
        },
        ValueType::Int32 => coerce_integer(value)
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int32)
            .ok_or_else(|| mismatch(value, target)),
        ValueType::Int64 => coerce_integer(value)
            .map(Value::Int64)
            .ok_or_else(|| mismatch(value, target)),
        ValueType::Float32 => coerce_float(value)
            .filter(|n| n.abs() <= f64::from(f32::MAX))
            .map(|n| Value::Float32(n as f32))
            .ok_or_else(|| mismatch(value, target)),
        ValueType::Float64 => coerce_float(value)
            .map(Value::Float64)
            .ok_or_else(|| mismatch(value, target)),
        ValueType::Decimal => coerce_decimal(value)
            .map(Value::Decimal)
            .ok_or_else(|| mismatch(value, target)),
        ValueType::Date => coerce_date(value)
            .map(Value::Date)
            .ok_or_else(|| mismatch(value, target)),
        ValueType::DateTime => coerce_datetime(value)
            .map(Value::DateTime)
            .ok_or_else(|| mismatch(value, target)),
        ValueType::Record(_) => Err(mismatch(value, target)),
    }
}

/// Coerce a literal to a list of the element type.
///
/// Arrays are coerced element-wise, strings are split on commas, and any
/// other scalar becomes a one-element list.
pub fn coerce_list(value: &Json, element: &ValueType) -> QueryResult<Value<'static>> {
    let items = match value {
        Json::Null => return Ok(Value::Null),
        Json::Array(items) => items
            .iter()
            .map(|item| coerce(item, element))
            .collect::<QueryResult<Vec<_>>>()?,
        Json::String(s) if !element.is_string() && s.contains(',') => s
            .split(',')
            .map(|piece| coerce(&Json::String(piece.trim().to_string()), element))
            .collect::<QueryResult<Vec<_>>>()?,
        Json::String(s) if element.is_string() && s.contains(',') => s
            .split(',')
            .map(|piece| Value::from(piece.trim().to_string()))
            .collect(),
        scalar => vec![coerce(scalar, element)?],
    };
    Ok(Value::List(items))
}

/// JSON kind of a literal, for error messages
pub fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(n) if n.is_f64() => "float",
        Json::Number(_) => "integer",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn mismatch(value: &Json, target: &ValueType) -> QueryError {
    let mut text = value.to_string();
    if text.len() > 64 {
        let cut = (0..=61).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        text.truncate(cut);
        text.push_str("...");
    }
    QueryError::coercion(text, json_kind(value), target)
}

fn coerce_bool(value: &Json) -> Option<Value<'static>> {
    match value {
        Json::Bool(b) => Some(Value::Bool(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        Json::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    // Exactly representable integers only; 2^63 itself is out of range
    (f.fract() == 0.0 && f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0)
        .then_some(f as i64)
}

fn coerce_integer(value: &Json) -> Option<i64> {
    match value {
        Json::Number(n) => integral(n),
        Json::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                let d = Decimal::from_str(s).ok()?;
                if d.fract().is_zero() {
                    i64::try_from(d).ok()
                } else {
                    None
                }
            })
        }
        _ => None,
    }
}

fn coerce_float(value: &Json) -> Option<f64> {
    let n = match value {
        Json::Number(n) => n.as_f64()?,
        Json::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn coerce_decimal(value: &Json) -> Option<Decimal> {
    let text = match value {
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Decimal::from(i));
            }
            n.to_string()
        }
        Json::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn coerce_date(value: &Json) -> Option<NaiveDate> {
    match value {
        Json::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
        }
        _ => None,
    }
}

fn coerce_datetime(value: &Json) -> Option<DateTime<Utc>> {
    match value {
        Json::String(s) => {
            let s = s.trim();
            parse_datetime(s).or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            })
        }
        // Unix timestamp in seconds
        Json::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}
