//! Extraction errors: SQL definition and C# call-site scanning.
//!
//! These are ParseSkip conditions. They are collected into a
//! `PipelineResult` and logged, never allowed to stop a run.

use super::error_code::{self, SprocErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to read {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("Skipping malformed procedure definition in {file}:{line}: {message}")]
    MalformedDefinition {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Procedure '{name}' in {file} replaces an earlier definition from {previous_file}")]
    DuplicateDefinition {
        name: String,
        file: String,
        previous_file: String,
    },

    #[error("Could not parse parameters of call at {file}:{line}: {message}")]
    MalformedCall {
        file: String,
        line: usize,
        message: String,
    },

    #[error("C# grammar unavailable: {message}")]
    Grammar { message: String },
}

impl SprocErrorCode for ExtractionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ReadFailed { .. } => error_code::READ_ERROR,
            _ => error_code::EXTRACTION_ERROR,
        }
    }
}
