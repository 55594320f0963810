//! Validation findings.

use std::fmt;

use serde::{Serialize, Serializer};

/// One problem with one call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidationIssue {
    /// No definition with the called name exists.
    ProcedureNotFound { procedure: String },
    /// An IN or INOUT parameter of the definition was not supplied.
    MissingRequiredParameter { parameter: String },
    /// A supplied key matches no parameter of the definition.
    UnknownParameter { parameter: String },
    /// The definition lacks one of the standard status outputs.
    MissingStandardOutput { parameter: String },
}

impl ValidationIssue {
    /// Parameter or procedure the issue is about.
    pub fn subject(&self) -> &str {
        match self {
            Self::ProcedureNotFound { procedure } => procedure,
            Self::MissingRequiredParameter { parameter }
            | Self::UnknownParameter { parameter }
            | Self::MissingStandardOutput { parameter } => parameter,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcedureNotFound { procedure } => {
                write!(f, "Stored procedure '{procedure}' not found in SQL definitions")
            }
            Self::MissingRequiredParameter { parameter } => {
                write!(f, "Required parameter '{parameter}' not found in call")
            }
            Self::UnknownParameter { parameter } => {
                write!(f, "Parameter '{parameter}' not found in procedure definition")
            }
            Self::MissingStandardOutput { parameter } => {
                write!(f, "Missing standard {parameter} OUTPUT parameter")
            }
        }
    }
}

impl Serialize for ValidationIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Verdict for one call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFinding {
    pub procedure_name: String,
    pub source_file: String,
    pub line_number: usize,
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationFinding {
    pub fn location(&self) -> String {
        format!("{}:{}", self.source_file, self.line_number)
    }
}

/// Aggregate counts of a validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_procedures: usize,
    pub total_calls: usize,
    /// Findings with at least one issue.
    pub mismatched_calls: usize,
    /// Issues across all findings.
    pub parameter_mismatch_count: usize,
}
