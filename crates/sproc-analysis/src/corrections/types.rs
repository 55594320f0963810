//! Issue categories, correction actions, and the correction report.

use std::fmt::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Groups of related validation issues. Every issue of a finding lands in
/// exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum IssueCategoryKind {
    MissingOutputParameters,
    MissingRequiredParameters,
    ParameterNameMismatches,
    UnknownProcedures,
    UnknownParameters,
}

impl IssueCategoryKind {
    /// 1 = critical, 2 = high, 3 = medium.
    pub fn priority(self) -> u8 {
        match self {
            Self::MissingOutputParameters | Self::MissingRequiredParameters => 1,
            Self::ParameterNameMismatches | Self::UnknownProcedures => 2,
            Self::UnknownParameters => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::MissingOutputParameters => "Missing Standard Output Parameters",
            Self::MissingRequiredParameters => "Missing Required Parameters",
            Self::ParameterNameMismatches => "Parameter Name Mismatches",
            Self::UnknownProcedures => "Unknown Stored Procedures",
            Self::UnknownParameters => "Unknown Parameters in C# Calls",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::MissingOutputParameters => {
                "Stored procedures missing the standard p_Status and p_ErrorMsg output parameters"
            }
            Self::MissingRequiredParameters => {
                "C# code not providing all required input parameters for stored procedure calls"
            }
            Self::ParameterNameMismatches => {
                "C# code using parameter names that don't match stored procedure definitions"
            }
            Self::UnknownProcedures => "C# code calling stored procedures that have no definition in the SQL sources",
            Self::UnknownParameters => "C# code providing parameters that don't exist in stored procedure definitions",
        }
    }

    pub fn recommended_action(self) -> &'static str {
        match self {
            Self::MissingOutputParameters => {
                "Add standard OUTPUT parameters p_Status INT and p_ErrorMsg VARCHAR(255) to all procedures"
            }
            Self::MissingRequiredParameters => "Add missing required parameters to C# stored procedure calls",
            Self::ParameterNameMismatches => {
                "Update C# parameter names to match stored procedure definitions or update procedure parameters"
            }
            Self::UnknownProcedures => {
                "Add the missing procedure definitions to the SQL sources or correct the procedure names in the calls"
            }
            Self::UnknownParameters => {
                "Remove unused parameters from C# calls or add missing parameters to stored procedures"
            }
        }
    }
}

/// Label used in recommendations and summaries.
pub fn priority_label(priority: u8) -> &'static str {
    match priority {
        1 => "CRITICAL",
        2 => "HIGH",
        3 => "MEDIUM",
        _ => "LOW",
    }
}

/// A supplied key that most likely meant a missing parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterRename {
    pub supplied: String,
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OccurrenceDetail {
    MissingOutputs(Vec<String>),
    MissingParameters(Vec<String>),
    Renames(Vec<ParameterRename>),
    UnknownProcedure,
    UnknownParameters(Vec<String>),
}

/// One call site contributing to a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOccurrence {
    pub procedure_name: String,
    pub source_file: String,
    pub line_number: usize,
    pub detail: OccurrenceDetail,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCategory {
    pub kind: IssueCategoryKind,
    pub title: String,
    pub description: String,
    pub priority: u8,
    /// Distinct procedure names, sorted.
    pub affected_procedures: Vec<String>,
    /// Number of calls in the category.
    pub issue_count: usize,
    pub recommended_action: String,
    pub occurrences: Vec<IssueOccurrence>,
}

impl IssueCategory {
    pub fn new(kind: IssueCategoryKind, occurrences: Vec<IssueOccurrence>) -> Self {
        let mut affected: Vec<String> = occurrences.iter().map(|o| o.procedure_name.clone()).collect();
        affected.sort_by_key(|p| p.to_lowercase());
        affected.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        Self {
            kind,
            title: kind.title().to_string(),
            description: kind.description().to_string(),
            priority: kind.priority(),
            affected_procedures: affected,
            issue_count: occurrences.len(),
            recommended_action: kind.recommended_action().to_string(),
            occurrences,
        }
    }

    /// `"CRITICAL: <title> affects <n> calls in <m> procedures - <action>"`.
    pub fn recommendation(&self) -> String {
        format!(
            "{}: {} affects {} calls in {} procedures - {}",
            priority_label(self.priority),
            self.title,
            self.issue_count,
            self.affected_procedures.len(),
            self.recommended_action
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorrectionActionKind {
    AddOutputParameters,
    FixParameterNames,
    AddMissingParameters,
    RegisterProcedureDefinition,
}

impl fmt::Display for CorrectionActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AddOutputParameters => "AddOutputParameters",
            Self::FixParameterNames => "FixParameterNames",
            Self::AddMissingParameters => "AddMissingParameters",
            Self::RegisterProcedureDefinition => "RegisterProcedureDefinition",
        };
        f.write_str(name)
    }
}

/// A concrete remediation step for a human reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionAction {
    pub kind: CorrectionActionKind,
    pub procedure_name: String,
    pub description: String,
    pub priority: u8,
    /// Call site the action edits; `None` for procedure-level actions.
    pub source_file: Option<String>,
    pub line_number: Option<usize>,
    pub sql_changes: Vec<String>,
    pub code_changes: Vec<String>,
    pub requires_manual_review: bool,
}

/// Categorized findings with ranked recommendations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionReport {
    pub generated_at: DateTime<Utc>,
    /// Ordered by priority, then by descending issue count.
    pub categories: Vec<IssueCategory>,
    pub recommendations: Vec<String>,
}

impl CorrectionReport {
    pub fn category(&self, kind: IssueCategoryKind) -> Option<&IssueCategory> {
        self.categories.iter().find(|c| c.kind == kind)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_summary_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Stored Procedure Correction Analysis Report");
        let _ = writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out);
        let _ = writeln!(out, "ISSUE CATEGORIES IDENTIFIED:");
        for category in &self.categories {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}: {}", priority_label(category.priority), category.title);
            let _ = writeln!(
                out,
                "- Affects {} calls in {} procedures",
                category.issue_count,
                category.affected_procedures.len()
            );
            let _ = writeln!(out, "- {}", category.description);
            let _ = writeln!(out, "- Recommended: {}", category.recommended_action);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "PRIORITY RECOMMENDATIONS:");
        for recommendation in &self.recommendations {
            let _ = writeln!(out, "- {recommendation}");
        }
        out
    }
}
