//! SprocErrorCode trait and the stable error code strings.

/// Trait for mapping sproc errors to stable, machine-readable codes.
/// Every error enum implements this so reports, logs, and the CLI can
/// branch on a code instead of on message text.
pub trait SprocErrorCode {
    /// Returns the error code string (e.g., "POLICY_VIOLATION").
    fn error_code(&self) -> &'static str;

    /// Returns the tagged error string: `[ERROR_CODE] message`.
    fn tagged(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const INVALID_PROCEDURE_NAME: &str = "INVALID_PROCEDURE_NAME";
pub const POLICY_VIOLATION: &str = "POLICY_VIOLATION";
pub const CONNECTION_ERROR: &str = "CONNECTION_ERROR";
pub const DB_ERROR: &str = "DB_ERROR";
pub const TRANSIENT_DB_ERROR: &str = "TRANSIENT_DB_ERROR";
pub const DRIVER_ERROR: &str = "DRIVER_ERROR";
pub const TIMEOUT: &str = "TIMEOUT";
pub const CANCELLED: &str = "CANCELLED";
pub const RETRIES_EXHAUSTED: &str = "RETRIES_EXHAUSTED";
pub const PROCEDURE_STATUS: &str = "PROCEDURE_STATUS";
pub const DECODE_ERROR: &str = "DECODE_ERROR";
pub const TRANSACTION_ERROR: &str = "TRANSACTION_ERROR";
pub const EXTRACTION_ERROR: &str = "EXTRACTION_ERROR";
pub const READ_ERROR: &str = "READ_ERROR";
pub const CORRECTION_NOT_IMPLEMENTED: &str = "CORRECTION_NOT_IMPLEMENTED";
pub const CORRECTION_ERROR: &str = "CORRECTION_ERROR";
