//! The uniform result envelope and the standard status outputs.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::{FromValue, ParamValue};

/// Status code synthesized for successful calls that carry no `p_Status`.
pub const SYNTHESIZED_SUCCESS: i64 = 1;
/// Status code for failures raised by the gateway itself.
pub const FAILURE_STATUS: i64 = -1;

/// Envelope returned by every gateway call.
///
/// `is_success()` is the only way to tell success from failure: a
/// successful call can legitimately return no rows or a default value.
#[derive(Debug, Clone, Serialize)]
pub struct ProcedureResult<T> {
    success: bool,
    pub status_code: i64,
    pub message: String,
    pub rows: Vec<T>,
    /// Affected-row count for non-query calls.
    pub rows_affected: u64,
    /// Resolved OUT parameters of with-status calls.
    pub outputs: Option<StatusOutputs>,
}

impl<T> ProcedureResult<T> {
    /// Success with no value.
    pub fn success() -> Self {
        Self::success_rows(Vec::new())
    }

    /// Success carrying one value.
    pub fn success_with(value: T) -> Self {
        Self::success_rows(vec![value])
    }

    /// Success carrying a row set.
    pub fn success_rows(rows: Vec<T>) -> Self {
        Self {
            success: true,
            status_code: SYNTHESIZED_SUCCESS,
            message: String::new(),
            rows,
            rows_affected: 0,
            outputs: None,
        }
    }

    /// Failure with a human-readable message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: FAILURE_STATUS,
            message: message.into(),
            rows: Vec::new(),
            rows_affected: 0,
            outputs: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The single value of scalar and transaction results.
    pub fn value(&self) -> Option<&T> {
        self.rows.first()
    }

    pub fn into_value(self) -> Option<T> {
        self.rows.into_iter().next()
    }

    pub(crate) fn with_status(mut self, outputs: StatusOutputs) -> Self {
        self.status_code = outputs.status;
        if !outputs.error_msg.is_empty() {
            self.message = outputs.error_msg.clone();
        }
        self.outputs = Some(outputs);
        self
    }

    pub(crate) fn with_rows_affected(mut self, rows_affected: u64) -> Self {
        self.rows_affected = rows_affected;
        self
    }
}

/// The expected SQL type of an OUT parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Int,
    Text,
}

/// Descriptor of an OUT parameter resolved after execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputParameter {
    pub name: String,
    pub kind: OutputKind,
}

impl OutputParameter {
    pub fn int(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OutputKind::Int,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OutputKind::Text,
        }
    }
}

/// Strongly typed view of a procedure's standard OUT parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusOutputs {
    /// `p_Status`: 1 success with data, 0 success without data, negative error.
    pub status: i64,
    /// `p_ErrorMsg`, empty when the procedure left it NULL.
    pub error_msg: String,
    /// Any other OUT values the procedure returned.
    pub extras: BTreeMap<String, ParamValue>,
}

impl StatusOutputs {
    /// Resolve the descriptor list against raw OUT values. A missing or
    /// NULL status is treated as an error status.
    pub fn resolve(
        descriptors: &[OutputParameter],
        mut raw: BTreeMap<String, ParamValue>,
    ) -> Self {
        let mut take = |name: &str| {
            let key = raw.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned();
            key.and_then(|k| raw.remove(&k))
        };

        let status_name = descriptors
            .iter()
            .find(|d| d.kind == OutputKind::Int)
            .map(|d| d.name.clone());
        let message_name = descriptors
            .iter()
            .find(|d| d.kind == OutputKind::Text)
            .map(|d| d.name.clone());

        let status = status_name.as_deref().and_then(&mut take).and_then(|v| v.as_i64());
        let error_msg = message_name
            .as_deref()
            .and_then(&mut take)
            .and_then(|v| v.as_text());

        let (status, error_msg) = match (status, error_msg) {
            (Some(status), msg) => (status, msg.unwrap_or_default()),
            (None, msg) => (
                FAILURE_STATUS,
                msg.unwrap_or_else(|| "procedure did not report a status".to_string()),
            ),
        };

        Self {
            status,
            error_msg,
            extras: raw,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status >= 0
    }

    /// Typed access to an additional OUT parameter.
    pub fn extra<T: FromValue>(&self, name: &str) -> Option<T> {
        self.extras
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| T::from_value(v).ok())
    }
}
