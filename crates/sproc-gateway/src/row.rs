//! Result-set rows.

use serde::Serialize;
use sproc_core::errors::GatewayError;

use crate::value::{FromValue, ParamValue};

/// One row of a procedure's result set. Column lookup is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<ParamValue>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<ParamValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&ParamValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn value_at(&self, index: usize) -> Option<&ParamValue> {
        self.values.get(index)
    }

    /// Typed column access.
    pub fn try_get<T: FromValue>(&self, column: &str) -> Result<T, GatewayError> {
        let value = self.get(column).ok_or_else(|| GatewayError::Decode {
            target: column.to_string(),
            message: "no such column".to_string(),
        })?;
        T::from_value(value)
    }
}

/// Conversion from a result-set row into a caller type.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, GatewayError>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, GatewayError> {
        Ok(row.clone())
    }
}
