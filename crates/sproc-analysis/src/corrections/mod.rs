//! Correction action generator: findings into prioritized remediation.
//!
//! Everything here is informational. Actions describe template SQL and C#
//! edits for a reviewer; nothing modifies existing source files or
//! database objects.

mod actions;
mod analyzer;
mod plan;
mod types;

pub use actions::apply;
pub use analyzer::CorrectionAnalyzer;
pub use plan::{CorrectionPlan, ParameterCorrection, StandardizedProcedure};
pub use types::{
    priority_label, CorrectionAction, CorrectionActionKind, CorrectionReport, IssueCategory, IssueCategoryKind,
    IssueOccurrence, OccurrenceDetail, ParameterRename,
};
