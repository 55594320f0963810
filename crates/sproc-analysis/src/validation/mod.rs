//! Cross validator: every call site checked against its definition.

mod normalize;
mod report;
mod types;
mod validator;

pub use normalize::NameNormalizer;
pub use types::{ValidationFinding, ValidationIssue, ValidationSummary};
pub use report::ValidationReport;
pub use validator::CrossValidator;
