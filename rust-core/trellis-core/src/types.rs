//! # Value Types and Column Casts
//!
//! Two value layers:
//!
//! - [`DbValue`]: what is bound to statements and read back from rows
//! - [`Value`]: what mapper users see after a column cast
//!
//! ## Casts
//!
//! A [`Cast`] directive per column converts stored scalars into richer
//! values ([`cast_out`]) and back ([`cast_in`]).
//!
//! | cast       | out                                        | in                  |
//! |------------|--------------------------------------------|---------------------|
//! | `array`    | `,;\|` separated text into a list of scalars | comma joined text   |
//! | `json`     | decoded JSON                               | encoded JSON        |
//! | `int`      | strict integer parse, null on failure      | integer             |
//! | `float`    | strict float parse, null on failure        | float               |
//! | `bool`     | strict boolean parse, null on failure      | boolean             |
//! | `date`     | `YYYY-MM-DD`                               | `YYYY-MM-DD`        |
//! | `datetime` | `YYYY-MM-DD HH:MM:SS` (`T` allowed)        | `YYYY-MM-DD HH:MM:SS` |
//!
//! Without a directive scalars pass through unchanged; anything else is
//! stringified on the way in.

use crate::json::{parse_json, to_json};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One result row, columns in select order
pub type Row = IndexMap<String, DbValue>;

/// Scalar value bound to statements and read from rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DbValue {
    /// Null value
    Null,
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// String value
    String(String),
    /// Boolean value
    Bool(bool),
    /// Binary data
    Bytes(Vec<u8>),
}

impl DbValue {
    /// Returns true for `Null`
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get as i64 if Int variant
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as &str if String variant
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            Self::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Column value after casting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// List of scalars (`array` cast)
    List(Vec<Value>),
    /// Decoded JSON (`json` cast)
    Json(serde_json::Value),
    /// Calendar date (`date` cast)
    Date(NaiveDate),
    /// Date and time (`datetime` cast)
    DateTime(NaiveDateTime),
}

impl Value {
    /// Returns true for `Null`
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value maps directly onto a [`DbValue`]
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Self::List(_) | Self::Json(_) | Self::Date(_) | Self::DateTime(_)
        )
    }

    /// Get as &str if String variant
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if Int variant
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            Self::String(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Json(v) => write!(f, "{v}"),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::DateTime(d) => write!(f, "{}", d.format(DATETIME_FORMAT)),
        }
    }
}

impl From<DbValue> for Value {
    fn from(v: DbValue) -> Self {
        match v {
            DbValue::Null => Self::Null,
            DbValue::Int(i) => Self::Int(i),
            DbValue::Float(x) => Self::Float(x),
            DbValue::String(s) => Self::String(s),
            DbValue::Bool(b) => Self::Bool(b),
            DbValue::Bytes(b) => Self::Bytes(b),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Per-column cast directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cast {
    /// Separated text as a list of scalars
    Array,
    /// JSON text as a decoded structure
    Json,
    /// Integer
    Int,
    /// Float
    Float,
    /// Boolean
    Bool,
    /// Calendar date
    Date,
    /// Date and time
    DateTime,
}

impl Cast {
    /// Parse a cast directive (e.g. `"int"`); `None` when unrecognized
    #[must_use]
    pub fn from_specifier(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "array" | "list" => Some(Self::Array),
            "json" | "object" => Some(Self::Json),
            "int" | "integer" => Some(Self::Int),
            "float" | "double" | "number" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Bool),
            "date" => Some(Self::Date),
            "datetime" | "timestamp" => Some(Self::DateTime),
            _ => None,
        }
    }

    /// Directive name
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Json => "json",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for Cast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Convert a stored value into its cast representation
#[must_use]
pub fn cast_out(value: &DbValue, cast: Option<Cast>) -> Value {
    if value.is_null() {
        return Value::Null;
    }

    match cast {
        None => value.clone().into(),
        Some(Cast::Array) => match value {
            DbValue::String(s) => Value::List(
                s.split(&[',', ';', '|'][..])
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(cast_scalar)
                    .collect(),
            ),
            other => Value::List(vec![other.clone().into()]),
        },
        Some(Cast::Json) => match value {
            DbValue::String(s) => {
                parse_json::<serde_json::Value>(s).map_or(Value::Null, Value::Json)
            }
            DbValue::Int(i) => Value::Json((*i).into()),
            DbValue::Float(x) => Value::Json((*x).into()),
            DbValue::Bool(b) => Value::Json((*b).into()),
            _ => Value::Null,
        },
        Some(Cast::Int) => to_int(value).map_or(Value::Null, Value::Int),
        Some(Cast::Float) => to_float(value).map_or(Value::Null, Value::Float),
        Some(Cast::Bool) => to_bool(value).map_or(Value::Null, Value::Bool),
        Some(Cast::Date) => match value {
            DbValue::String(s) => parse_date(s).map_or(Value::Null, Value::Date),
            _ => Value::Null,
        },
        Some(Cast::DateTime) => match value {
            DbValue::String(s) => parse_datetime(s).map_or(Value::Null, Value::DateTime),
            DbValue::Int(ts) => DateTime::from_timestamp(*ts, 0)
                .map_or(Value::Null, |d| Value::DateTime(d.naive_utc())),
            _ => Value::Null,
        },
    }
}

/// Convert a cast value back into its stored form
#[must_use]
pub fn cast_in(value: &Value, cast: Option<Cast>) -> DbValue {
    match (value, cast) {
        (Value::Null, _) => DbValue::Null,
        (Value::Json(v), _) => DbValue::String(v.to_string()),
        (v, Some(Cast::Json)) => to_json(v).map_or(DbValue::Null, DbValue::String),
        (Value::List(_) | Value::Date(_) | Value::DateTime(_), _) => {
            DbValue::String(value.to_string())
        }
        (v, Some(cast @ (Cast::Int | Cast::Float | Cast::Bool))) => {
            cast_out(&scalar(v), Some(cast)).into_db()
        }
        (v, _) => scalar(v),
    }
}

/// Interpret literal text as the scalar it spells
///
/// Decimal, `0x` hex, `0b` binary and leading-zero octal integers, floats,
/// `true`/`false` and `null` are recognized; anything else stays text.
#[must_use]
pub fn cast_scalar(text: &str) -> Value {
    match text.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let sign = if negative { -1 } else { 1 };

    let radix_parse = |body: &str, radix: u32| {
        (!body.is_empty())
            .then(|| i64::from_str_radix(body, radix).ok())
            .flatten()
    };

    let int = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        radix_parse(hex, 16)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        radix_parse(bin, 2)
    } else if digits.len() > 1 && digits.starts_with('0') && digits.bytes().all(|b| b.is_ascii_digit()) {
        radix_parse(&digits[1..], 8)
    } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    };

    if let Some(i) = int {
        return Value::Int(sign * i);
    }

    if text.bytes().any(|b| b.is_ascii_digit())
        && text.bytes().all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b))
    {
        if let Ok(x) = text.parse::<f64>() {
            return Value::Float(x);
        }
    }

    Value::String(text.to_string())
}

impl Value {
    /// Stored form of a scalar; non-scalars are stringified
    #[must_use]
    pub fn into_db(self) -> DbValue {
        match self {
            Self::Null => DbValue::Null,
            Self::Int(i) => DbValue::Int(i),
            Self::Float(x) => DbValue::Float(x),
            Self::Bool(b) => DbValue::Bool(b),
            Self::String(s) => DbValue::String(s),
            Self::Bytes(b) => DbValue::Bytes(b),
            other => DbValue::String(other.to_string()),
        }
    }
}

fn scalar(value: &Value) -> DbValue {
    value.clone().into_db()
}

fn to_int(value: &DbValue) -> Option<i64> {
    match value {
        DbValue::Int(i) => Some(*i),
        #[allow(clippy::cast_possible_truncation)]
        DbValue::Float(x) if x.fract() == 0.0 && x.is_finite() => Some(*x as i64),
        DbValue::Bool(b) => Some(i64::from(*b)),
        DbValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_float(value: &DbValue) -> Option<f64> {
    match value {
        #[allow(clippy::cast_precision_loss)]
        DbValue::Int(i) => Some(*i as f64),
        DbValue::Float(x) => Some(*x),
        DbValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        DbValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_bool(value: &DbValue) -> Option<bool> {
    match value {
        DbValue::Bool(b) => Some(*b),
        DbValue::Int(0) => Some(false),
        DbValue::Int(1) => Some(true),
        DbValue::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(s).map(|d| d.date()))
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
