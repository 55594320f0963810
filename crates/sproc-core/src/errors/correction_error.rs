//! Correction generator errors.

use super::error_code::{self, SprocErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum CorrectionError {
    #[error(
        "Applying {actions} correction actions is not implemented; rerun in dry-run mode and apply the changes by hand"
    )]
    NotImplemented { actions: usize },

    #[error("Failed to write {path}: {message}")]
    WriteFailed { path: String, message: String },
}

impl SprocErrorCode for CorrectionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotImplemented { .. } => error_code::CORRECTION_NOT_IMPLEMENTED,
            Self::WriteFailed { .. } => error_code::CORRECTION_ERROR,
        }
    }
}
