//! sproc-analysis: static cross-validation of stored procedure calls.
//!
//! The pipeline reads procedure definitions out of SQL scripts, finds
//! gateway invocations in C# sources, checks every call's parameter map
//! against the matching definition, and turns the findings into a
//! prioritized correction report. Every stage is best-effort: a bad file
//! or fragment becomes a warning in the [`PipelineResult`], never an
//! aborted run.
//!
//! [`PipelineResult`]: sproc_core::errors::PipelineResult

pub mod call_sites;
pub mod corrections;
pub mod definitions;
pub mod pipeline;
pub mod scanner;
pub mod validation;

pub use call_sites::{CallSiteExtractor, ParameterSource, ProcedureCall};
pub use corrections::{CorrectionAction, CorrectionAnalyzer, CorrectionPlan, CorrectionReport, IssueCategory};
pub use definitions::{DefinitionCatalog, DefinitionExtractor, ParameterDirection, ProcedureDefinition, ProcedureParameter};
pub use pipeline::ValidationPipeline;
pub use validation::{CrossValidator, ValidationFinding, ValidationIssue, ValidationReport};
