//! Finding classification and action generation.

use std::collections::BTreeMap;

use chrono::Utc;
use sproc_core::config::CorrectionConfig;

use super::types::{
    CorrectionAction, CorrectionActionKind, CorrectionReport, IssueCategory, IssueCategoryKind, IssueOccurrence,
    OccurrenceDetail, ParameterRename,
};
use crate::validation::{ValidationFinding, ValidationIssue, ValidationReport};

/// Turns a validation report into categories, recommendations, and actions.
#[derive(Debug, Clone)]
pub struct CorrectionAnalyzer {
    medium_recommendation_limit: usize,
    preview_limit: usize,
}

impl CorrectionAnalyzer {
    pub fn new() -> Self {
        Self::from_config(&CorrectionConfig::default())
    }

    pub fn from_config(config: &CorrectionConfig) -> Self {
        Self {
            medium_recommendation_limit: config.effective_medium_recommendation_limit(),
            preview_limit: config.effective_preview_limit(),
        }
    }

    pub fn preview_limit(&self) -> usize {
        self.preview_limit
    }

    pub fn analyze(&self, report: &ValidationReport) -> CorrectionReport {
        let mut grouped: BTreeMap<IssueCategoryKind, Vec<IssueOccurrence>> = BTreeMap::new();
        for finding in report.invalid_findings() {
            for (kind, detail) in classify(finding) {
                grouped.entry(kind).or_default().push(IssueOccurrence {
                    procedure_name: finding.procedure_name.clone(),
                    source_file: finding.source_file.clone(),
                    line_number: finding.line_number,
                    detail,
                });
            }
        }

        let mut categories: Vec<IssueCategory> = grouped
            .into_iter()
            .map(|(kind, occurrences)| IssueCategory::new(kind, occurrences))
            .collect();
        categories.sort_by(|a, b| a.priority.cmp(&b.priority).then(b.issue_count.cmp(&a.issue_count)));

        let recommendations = self.recommendations(&categories);
        tracing::info!(
            categories = categories.len(),
            recommendations = recommendations.len(),
            "correction analysis complete"
        );

        CorrectionReport {
            generated_at: Utc::now(),
            categories,
            recommendations,
        }
    }

    /// Actions for the critical and high categories.
    pub fn generate_actions(&self, report: &CorrectionReport) -> Vec<CorrectionAction> {
        let actions: Vec<CorrectionAction> = report
            .categories
            .iter()
            .filter(|c| c.priority <= 2)
            .flat_map(actions_for)
            .collect();
        tracing::info!(actions = actions.len(), "correction actions generated");
        actions
    }

    fn recommendations(&self, categories: &[IssueCategory]) -> Vec<String> {
        let mut out = Vec::new();
        for priority in 1..=3u8 {
            let limit = if priority == 3 {
                self.medium_recommendation_limit
            } else {
                usize::MAX
            };
            // `categories` is already ordered by descending count within a priority.
            out.extend(
                categories
                    .iter()
                    .filter(|c| c.priority == priority)
                    .take(limit)
                    .map(IssueCategory::recommendation),
            );
        }
        out
    }
}

impl Default for CorrectionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Split the issues of one finding across categories. An unknown key and a
/// missing parameter in the same call are read as one misspelled name.
fn classify(finding: &ValidationFinding) -> Vec<(IssueCategoryKind, OccurrenceDetail)> {
    let mut missing_outputs = Vec::new();
    let mut missing = Vec::new();
    let mut unknown = Vec::new();
    let mut out = Vec::new();

    for issue in &finding.issues {
        match issue {
            ValidationIssue::ProcedureNotFound { .. } => {
                out.push((IssueCategoryKind::UnknownProcedures, OccurrenceDetail::UnknownProcedure));
            }
            ValidationIssue::MissingStandardOutput { parameter } => missing_outputs.push(parameter.clone()),
            ValidationIssue::MissingRequiredParameter { parameter } => missing.push(parameter.clone()),
            ValidationIssue::UnknownParameter { parameter } => unknown.push(parameter.clone()),
        }
    }

    let renames = pair_renames(&mut unknown, &mut missing);

    if !missing_outputs.is_empty() {
        out.push((
            IssueCategoryKind::MissingOutputParameters,
            OccurrenceDetail::MissingOutputs(missing_outputs),
        ));
    }
    if !missing.is_empty() {
        out.push((
            IssueCategoryKind::MissingRequiredParameters,
            OccurrenceDetail::MissingParameters(missing),
        ));
    }
    if !renames.is_empty() {
        out.push((IssueCategoryKind::ParameterNameMismatches, OccurrenceDetail::Renames(renames)));
    }
    if !unknown.is_empty() {
        out.push((
            IssueCategoryKind::UnknownParameters,
            OccurrenceDetail::UnknownParameters(unknown),
        ));
    }
    out
}

/// Pair unknown keys with missing parameters, removing paired names from
/// both lists. Names that agree once case, `@`, a `p_` prefix and `_` are
/// ignored pair first; then each remaining key takes its closest related
/// missing name, if any. Anything else stays unpaired.
fn pair_renames(unknown: &mut Vec<String>, missing: &mut Vec<String>) -> Vec<ParameterRename> {
    let mut renames = Vec::new();

    let mut i = 0;
    while i < unknown.len() {
        let key = squash(&unknown[i]);
        match missing.iter().position(|m| squash(m) == key) {
            Some(j) => renames.push(ParameterRename {
                supplied: unknown.remove(i),
                expected: missing.remove(j),
            }),
            None => i += 1,
        }
    }

    let mut i = 0;
    while i < unknown.len() {
        let key = squash(&unknown[i]);
        let closest = missing
            .iter()
            .enumerate()
            .map(|(j, m)| (j, squash(m)))
            .filter(|(_, m)| related(&key, m))
            .map(|(j, m)| (j, similarity(&key, &m)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match closest {
            Some((j, _)) => renames.push(ParameterRename {
                supplied: unknown.remove(i),
                expected: missing.remove(j),
            }),
            None => i += 1,
        }
    }
    renames
}

fn squash(name: &str) -> String {
    let name = name.trim().trim_start_matches('@');
    let name = match name.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("p_") && name.len() > 2 => &name[2..],
        _ => name,
    };
    name.chars().filter(|c| *c != '_').flat_map(char::to_lowercase).collect()
}

/// More alike than not, or one name abbreviates the other (`pos`, `position`).
fn related(a: &str, b: &str) -> bool {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    similarity(a, b) > 0.5 || (shorter.len() >= 3 && longer.starts_with(shorter))
}

/// `1 - distance / longer length`.
fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            current[j + 1] = (previous[j + 1] + 1).min(current[j] + 1).min(previous[j] + cost);
        }
        previous = current;
    }
    previous[b.len()]
}

fn actions_for(category: &IssueCategory) -> Vec<CorrectionAction> {
    match category.kind {
        IssueCategoryKind::MissingOutputParameters => category
            .affected_procedures
            .iter()
            .map(|procedure| CorrectionAction {
                kind: CorrectionActionKind::AddOutputParameters,
                procedure_name: procedure.clone(),
                description: format!(
                    "Add standard OUTPUT parameters @p_Status INT and @p_ErrorMsg VARCHAR(255) to {procedure}"
                ),
                priority: category.priority,
                source_file: None,
                line_number: None,
                sql_changes: vec![
                    format!("ALTER PROCEDURE {procedure} ADD @p_Status INT OUTPUT, @p_ErrorMsg VARCHAR(255) OUTPUT"),
                    format!("-- Add to end of {procedure}: SET @p_Status = 1; SET @p_ErrorMsg = 'Success';"),
                ],
                code_changes: Vec::new(),
                requires_manual_review: false,
            })
            .collect(),
        IssueCategoryKind::UnknownProcedures => category
            .affected_procedures
            .iter()
            .map(|procedure| CorrectionAction {
                kind: CorrectionActionKind::RegisterProcedureDefinition,
                procedure_name: procedure.clone(),
                description: format!(
                    "Add a definition for {procedure} to the SQL sources or correct the procedure name in its calls"
                ),
                priority: category.priority,
                source_file: None,
                line_number: None,
                sql_changes: Vec::new(),
                code_changes: category
                    .occurrences
                    .iter()
                    .filter(|o| o.procedure_name.eq_ignore_ascii_case(procedure))
                    .map(|o| format!("{}:{}: verify the procedure name '{}'", o.source_file, o.line_number, o.procedure_name))
                    .collect(),
                requires_manual_review: true,
            })
            .collect(),
        IssueCategoryKind::ParameterNameMismatches | IssueCategoryKind::MissingRequiredParameters => category
            .occurrences
            .iter()
            .filter_map(|o| call_site_action(category, o))
            .collect(),
        IssueCategoryKind::UnknownParameters => Vec::new(),
    }
}

fn call_site_action(category: &IssueCategory, occurrence: &IssueOccurrence) -> Option<CorrectionAction> {
    let location = format!("{}:{}", occurrence.source_file, occurrence.line_number);
    let (kind, description, code_changes) = match &occurrence.detail {
        OccurrenceDetail::Renames(renames) => (
            CorrectionActionKind::FixParameterNames,
            format!(
                "Rename {} in call to {}",
                renames
                    .iter()
                    .map(|r| format!("'{}' to '{}'", r.supplied, r.expected))
                    .collect::<Vec<_>>()
                    .join(", "),
                occurrence.procedure_name
            ),
            renames
                .iter()
                .map(|r| format!("{location}: replace [\"{}\"] with [\"{}\"]", r.supplied, r.expected))
                .collect(),
        ),
        OccurrenceDetail::MissingParameters(missing) => (
            CorrectionActionKind::AddMissingParameters,
            format!(
                "Add missing required parameters {} to call to {}",
                missing.join(", "),
                occurrence.procedure_name
            ),
            missing
                .iter()
                .map(|p| format!("{location}: add [\"{p}\"] = <value>"))
                .collect(),
        ),
        _ => return None,
    };

    Some(CorrectionAction {
        kind,
        procedure_name: occurrence.procedure_name.clone(),
        description,
        priority: category.priority,
        source_file: Some(occurrence.source_file.clone()),
        line_number: Some(occurrence.line_number),
        sql_changes: Vec::new(),
        code_changes,
        requires_manual_review: true,
    })
}
