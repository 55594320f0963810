//! Procedure call gateway errors.

use super::error_code::{self, SprocErrorCode};
use crate::config::database_config::DEFAULT_TRANSIENT_ERROR_CODES;

/// Errors that can occur while calling a stored procedure.
///
/// None of these ever crosses the gateway boundary as an `Err`: the gateway
/// reports them to the error sink and folds them into a failed result.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Procedure name must not be blank")]
    EmptyProcedureName,

    #[error("Policy violation: '{procedure}' {reason}")]
    PolicyViolation { procedure: String, reason: String },

    #[error("Connection failed: {message}")]
    Connection { code: Option<u16>, message: String },

    #[error("Database error {code}: {message}")]
    Database { code: u16, message: String },

    #[error("Driver error: {message}")]
    Driver { message: String },

    #[error("Command timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<GatewayError>,
    },

    #[error("Procedure reported status {status}: {message}")]
    ProcedureStatus { status: i64, message: String },

    #[error("Failed to decode {target}: {message}")]
    Decode { target: String, message: String },

    #[error("Transaction {stage} failed: {message}")]
    Transaction { stage: &'static str, message: String },
}

impl GatewayError {
    /// The server error number, when the failure carries one.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            Self::Database { code, .. } => Some(*code),
            Self::Connection { code, .. } => *code,
            Self::RetriesExhausted { last, .. } => last.server_code(),
            _ => None,
        }
    }

    /// Whether this failure is on the retry allow-list `codes`.
    pub fn is_transient(&self, codes: &[u16]) -> bool {
        match self {
            Self::Database { code, .. } => codes.contains(code),
            Self::Connection { code: Some(code), .. } => codes.contains(code),
            _ => false,
        }
    }

    /// Error code with server errors classified against the retry
    /// allow-list `transient_codes`. [`SprocErrorCode::error_code`] uses the
    /// default allow-list.
    pub fn error_code_for(&self, transient_codes: &[u16]) -> &'static str {
        match self {
            Self::EmptyProcedureName => error_code::INVALID_PROCEDURE_NAME,
            Self::PolicyViolation { .. } => error_code::POLICY_VIOLATION,
            Self::Connection { .. } => error_code::CONNECTION_ERROR,
            Self::Database { code, .. } if transient_codes.contains(code) => error_code::TRANSIENT_DB_ERROR,
            Self::Database { .. } => error_code::DB_ERROR,
            Self::Driver { .. } => error_code::DRIVER_ERROR,
            Self::Timeout { .. } => error_code::TIMEOUT,
            Self::Cancelled => error_code::CANCELLED,
            Self::RetriesExhausted { .. } => error_code::RETRIES_EXHAUSTED,
            Self::ProcedureStatus { .. } => error_code::PROCEDURE_STATUS,
            Self::Decode { .. } => error_code::DECODE_ERROR,
            Self::Transaction { .. } => error_code::TRANSACTION_ERROR,
        }
    }

    /// Policy violations are rejected before any I/O.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::PolicyViolation { .. } | Self::EmptyProcedureName)
    }
}

impl SprocErrorCode for GatewayError {
    fn error_code(&self) -> &'static str {
        self.error_code_for(&DEFAULT_TRANSIENT_ERROR_CODES)
    }
}
