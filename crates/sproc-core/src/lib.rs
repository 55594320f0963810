//! sproc-core: shared foundation for the stored-procedure gateway and the
//! offline call-site validator.
//!
//! Errors (one enum per subsystem), layered TOML configuration, tracing
//! setup, and the error-reporting collaborator every gateway failure is
//! forwarded to.

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod tracing;

pub use config::SprocConfig;
pub use diagnostics::{ErrorReport, ErrorSink, SeenErrorSet};
pub use errors::SprocErrorCode;
