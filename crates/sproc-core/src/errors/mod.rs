//! Error handling for sproc.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod correction_error;
pub mod error_code;
pub mod extraction_error;
pub mod gateway_error;
pub mod pipeline_error;

pub use config_error::ConfigError;
pub use correction_error::CorrectionError;
pub use error_code::SprocErrorCode;
pub use extraction_error::ExtractionError;
pub use gateway_error::GatewayError;
pub use pipeline_error::{PipelineError, PipelineResult};
