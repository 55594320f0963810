//! Validation report and its renderings.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{ValidationFinding, ValidationSummary};
use crate::call_sites::ProcedureCall;
use crate::definitions::ProcedureDefinition;

/// Snapshot of one validation run. Never updated in place; a new run
/// produces a new report.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub generated_at: DateTime<Utc>,
    pub summary: ValidationSummary,
    pub definitions: Vec<ProcedureDefinition>,
    pub calls: Vec<ProcedureCall>,
    pub findings: Vec<ValidationFinding>,
    /// Non-fatal extraction warnings from the run that built this report.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new(
        definitions: Vec<ProcedureDefinition>,
        calls: Vec<ProcedureCall>,
        findings: Vec<ValidationFinding>,
    ) -> Self {
        let summary = ValidationSummary {
            total_procedures: definitions.len(),
            total_calls: calls.len(),
            mismatched_calls: findings.iter().filter(|f| !f.is_valid).count(),
            parameter_mismatch_count: findings.iter().map(|f| f.issues.len()).sum(),
        };
        Self {
            generated_at: Utc::now(),
            summary,
            definitions,
            calls,
            findings,
            warnings: Vec::new(),
        }
    }

    pub fn invalid_findings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| !f.is_valid)
    }

    pub fn has_mismatches(&self) -> bool {
        self.summary.mismatched_calls > 0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text summary listing every invalid call with its issues.
    pub fn to_summary_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;
        let _ = writeln!(out, "Stored Procedure Validation Report");
        let _ = writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out);
        let _ = writeln!(out, "SUMMARY STATISTICS:");
        let _ = writeln!(out, "- Total Stored Procedures: {}", s.total_procedures);
        let _ = writeln!(out, "- Total Procedure Calls: {}", s.total_calls);
        let _ = writeln!(out, "- Mismatched Calls: {}", s.mismatched_calls);
        let _ = writeln!(out, "- Parameter Issues: {}", s.parameter_mismatch_count);
        if !self.warnings.is_empty() {
            let _ = writeln!(out, "- Extraction Warnings: {}", self.warnings.len());
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "VALIDATION RESULTS:");

        for finding in self.invalid_findings() {
            let _ = writeln!(out);
            let _ = writeln!(out, "PROCEDURE: {}", finding.procedure_name);
            let _ = writeln!(out, "File: {}", finding.location());
            let _ = writeln!(out, "Issues:");
            for issue in &finding.issues {
                let _ = writeln!(out, "  - {issue}");
            }
        }

        if !self.has_mismatches() {
            let _ = writeln!(out, "All calls match their procedure definitions.");
        }
        out
    }
}
