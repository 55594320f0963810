//! Parameter values and ordered parameter maps.

use chrono::NaiveDateTime;
use serde::Serialize;
use sproc_core::errors::GatewayError;

/// A value bound to, or read back from, a procedure parameter or column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view. Text and byte values holding a number also convert,
    /// since session variables come back from the server untyped.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            Self::Bool(v) => Some(i64::from(*v)),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view; NULL has none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s.clone()),
            Self::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            Self::Bool(v) => Some(v.to_string()),
            Self::Int(v) => Some(v.to_string()),
            Self::UInt(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::DateTime(v) => Some(v.to_string()),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Conversion from a returned value into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError>;
}

fn decode_error(target: &str, value: &ParamValue) -> GatewayError {
    GatewayError::Decode {
        target: target.to_string(),
        message: format!("cannot convert {value:?}"),
    }
}

impl FromValue for ParamValue {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError> {
        value.as_i64().ok_or_else(|| decode_error("i64", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError> {
        value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| decode_error("i32", value))
    }
}

impl FromValue for u64 {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError> {
        match value {
            ParamValue::UInt(v) => Ok(*v),
            other => other
                .as_i64()
                .and_then(|v| u64::try_from(v).ok())
                .ok_or_else(|| decode_error("u64", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError> {
        match value {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            ParamValue::UInt(v) => Ok(*v as f64),
            ParamValue::Text(s) => s.trim().parse().map_err(|_| decode_error("f64", value)),
            other => Err(decode_error("f64", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError> {
        match value {
            ParamValue::Bool(v) => Ok(*v),
            other => other
                .as_i64()
                .map(|v| v != 0)
                .ok_or_else(|| decode_error("bool", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError> {
        value.as_text().ok_or_else(|| decode_error("String", value))
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError> {
        match value {
            ParamValue::DateTime(v) => Ok(*v),
            other => Err(decode_error("NaiveDateTime", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &ParamValue) -> Result<Self, GatewayError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// Insertion-ordered parameter map: logical key to value.
///
/// Keys are matched against the procedure's declared parameters
/// case-insensitively, tolerating a leading `@` and the `p_` prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureParams {
    entries: Vec<(String, ParamValue)>,
}

impl ProcedureParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace (case-insensitive on the key).
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ProcedureParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
