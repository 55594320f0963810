//! The `ErrorSink` trait and its two stock implementations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::seen::SeenErrorSet;
use crate::errors::error_code;

/// Coarse grouping used for dedup bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ErrorCategory {
    Database,
    Network,
    Policy,
    Configuration,
    Other,
}

impl ErrorCategory {
    /// Classify an error by its code.
    pub fn from_code(code: &str) -> Self {
        match code {
            error_code::DB_ERROR
            | error_code::TRANSIENT_DB_ERROR
            | error_code::PROCEDURE_STATUS
            | error_code::RETRIES_EXHAUSTED
            | error_code::TRANSACTION_ERROR
            | error_code::DECODE_ERROR
            | error_code::DRIVER_ERROR => Self::Database,
            error_code::CONNECTION_ERROR | error_code::TIMEOUT => Self::Network,
            error_code::POLICY_VIOLATION | error_code::INVALID_PROCEDURE_NAME => Self::Policy,
            error_code::CONFIG_ERROR => Self::Configuration,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Database => "database",
            Self::Network => "network",
            Self::Policy => "policy",
            Self::Configuration => "configuration",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// One failure handed to the sink: the raw error plus structured context.
pub struct ErrorReport<'a> {
    pub error: &'a (dyn std::error::Error + Send + Sync + 'static),
    pub code: &'static str,
    pub operation: &'a str,
    pub user_id: Option<&'a str>,
    pub context: BTreeMap<String, String>,
}

impl<'a> ErrorReport<'a> {
    pub fn new(
        error: &'a (dyn std::error::Error + Send + Sync + 'static),
        code: &'static str,
        operation: &'a str,
    ) -> Self {
        Self {
            error,
            code,
            operation,
            user_id: None,
            context: BTreeMap::new(),
        }
    }

    pub fn user(mut self, user_id: Option<&'a str>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code)
    }

    /// Dedup key: same category, operation, and code count as one error.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}:{}", self.category(), self.operation, self.code)
    }
}

/// External error-reporting facility.
pub trait ErrorSink: Send + Sync {
    fn report(&self, report: &ErrorReport<'_>);
}

/// Logs every report through `tracing`. The first occurrence of a key is
/// logged at `error!`, repeats at `debug!`.
pub struct TracingErrorSink {
    seen: Arc<Mutex<SeenErrorSet>>,
}

impl TracingErrorSink {
    pub fn new(seen: Arc<Mutex<SeenErrorSet>>) -> Self {
        Self { seen }
    }
}

impl Default for TracingErrorSink {
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(SeenErrorSet::new())))
    }
}

impl ErrorSink for TracingErrorSink {
    fn report(&self, report: &ErrorReport<'_>) {
        let key = report.dedup_key();
        let first = match self.seen.lock() {
            Ok(mut seen) => seen.mark_seen(report.category(), &key),
            // A poisoned set still gets the report logged.
            Err(_) => true,
        };
        if first {
            tracing::error!(
                code = report.code,
                category = %report.category(),
                operation = report.operation,
                user = report.user_id.unwrap_or("-"),
                context = ?report.context,
                error = %report.error,
                "operation failed"
            );
        } else {
            tracing::debug!(
                code = report.code,
                operation = report.operation,
                error = %report.error,
                "repeated failure"
            );
        }
    }
}

/// An owned copy of a report.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedError {
    pub code: String,
    pub category: ErrorCategory,
    pub operation: String,
    pub user_id: Option<String>,
    pub message: String,
    pub context: BTreeMap<String, String>,
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    reports: Mutex<Vec<RecordedError>>,
}

impl MemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn reports(&self) -> Vec<RecordedError> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for MemoryErrorSink {
    fn report(&self, report: &ErrorReport<'_>) {
        let recorded = RecordedError {
            code: report.code.to_string(),
            category: report.category(),
            operation: report.operation.to_string(),
            user_id: report.user_id.map(str::to_string),
            message: report.error.to_string(),
            context: report.context.clone(),
        };
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(recorded);
        }
    }
}
