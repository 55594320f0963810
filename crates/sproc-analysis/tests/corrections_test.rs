//! Correction analysis, action generation, dry-run application, and plans.

use std::collections::BTreeMap;

use sproc_analysis::call_sites::{ParameterSource, ProcedureCall};
use sproc_analysis::corrections::{
    apply, CorrectionActionKind, CorrectionAnalyzer, CorrectionPlan, IssueCategoryKind, OccurrenceDetail,
};
use sproc_analysis::definitions::{DefinitionCatalog, ParameterDirection, ProcedureDefinition, ProcedureParameter};
use sproc_analysis::validation::{CrossValidator, ValidationReport};
use sproc_core::config::CorrectionConfig;
use sproc_core::errors::CorrectionError;

fn definition(name: &str, params: &[(&str, ParameterDirection)]) -> ProcedureDefinition {
    ProcedureDefinition {
        name: name.to_string(),
        parameters: params
            .iter()
            .map(|(n, d)| ProcedureParameter::new(*n, "INT", *d))
            .collect(),
        source_file: "procs.sql".to_string(),
    }
}

fn call(procedure: &str, file: &str, line: usize, keys: &[&str]) -> ProcedureCall {
    ProcedureCall {
        procedure_name: procedure.to_string(),
        source_file: file.to_string(),
        line_number: line,
        method: "ExecuteWithStatus".to_string(),
        supplied_parameters: keys
            .iter()
            .map(|k| (k.to_string(), "x".to_string()))
            .collect::<BTreeMap<_, _>>(),
        parameter_source: ParameterSource::Inline,
    }
}

/// Two procedures without status outputs, one complete procedure, and calls
/// exercising every category.
fn report() -> ValidationReport {
    use ParameterDirection::{In, Out};
    let catalog: DefinitionCatalog = [
        definition("inv_inventory_Get_ByPartID", &[("p_PartID", In)]),
        definition("inv_location_Get_All", &[]),
        definition(
            "qb_quickbuttons_Save",
            &[("p_UserID", In), ("p_Position", In), ("p_Status", Out), ("p_ErrorMsg", Out)],
        ),
    ]
    .into_iter()
    .collect();

    let calls = vec![
        call("inv_inventory_Get_ByPartID", "Inventory.cs", 10, &["p_PartID"]),
        call("inv_location_Get_All", "Location.cs", 20, &[]),
        call("qb_quickbuttons_Save", "QuickButtons.cs", 30, &["p_UserID", "p_Pos"]),
        call("qb_quickbuttons_Save", "QuickButtons.cs", 40, &["p_UserID"]),
        call("qb_quickbuttons_Save", "QuickButtons.cs", 50, &["p_UserID", "p_Position", "p_Extra"]),
        call("qb_quickbuttons_Delete", "QuickButtons.cs", 60, &[]),
    ];
    CrossValidator::default().validate(&catalog, calls)
}

// ---- Categories ----

#[test]
fn findings_fall_into_exclusive_categories() {
    let analysis = CorrectionAnalyzer::new().analyze(&report());

    let outputs = analysis.category(IssueCategoryKind::MissingOutputParameters).unwrap();
    assert_eq!(outputs.priority, 1);
    assert_eq!(outputs.issue_count, 2);
    assert_eq!(
        outputs.affected_procedures,
        vec!["inv_inventory_Get_ByPartID", "inv_location_Get_All"]
    );

    let renames = analysis.category(IssueCategoryKind::ParameterNameMismatches).unwrap();
    assert_eq!(renames.priority, 2);
    assert_eq!(renames.issue_count, 1);
    match &renames.occurrences[0].detail {
        OccurrenceDetail::Renames(pairs) => {
            assert_eq!(pairs[0].supplied, "p_Pos");
            assert_eq!(pairs[0].expected, "p_Position");
        }
        other => panic!("unexpected detail {other:?}"),
    }

    let missing = analysis.category(IssueCategoryKind::MissingRequiredParameters).unwrap();
    assert_eq!(missing.issue_count, 1, "the renamed call must not count as missing");
    assert_eq!(missing.occurrences[0].line_number, 40);

    let unknown = analysis.category(IssueCategoryKind::UnknownParameters).unwrap();
    assert_eq!(unknown.priority, 3);
    assert_eq!(unknown.occurrences[0].line_number, 50);

    let procedures = analysis.category(IssueCategoryKind::UnknownProcedures).unwrap();
    assert_eq!(procedures.affected_procedures, vec!["qb_quickbuttons_Delete"]);
}

#[test]
fn unrelated_unknown_key_does_not_hide_missing_parameter() {
    use ParameterDirection::{In, Out};
    let catalog: DefinitionCatalog = [definition(
        "qb_quickbuttons_Save",
        &[("p_UserID", In), ("p_Position", In), ("p_Status", Out), ("p_ErrorMsg", Out)],
    )]
    .into_iter()
    .collect();
    let calls = vec![call("qb_quickbuttons_Save", "QuickButtons.cs", 12, &["p_UserID", "p_Slot"])];
    let analysis = CorrectionAnalyzer::new().analyze(&CrossValidator::default().validate(&catalog, calls));

    assert!(analysis.category(IssueCategoryKind::ParameterNameMismatches).is_none());
    let missing = analysis.category(IssueCategoryKind::MissingRequiredParameters).unwrap();
    assert_eq!(missing.priority, 1);
    assert_eq!(missing.issue_count, 1);
    let unknown = analysis.category(IssueCategoryKind::UnknownParameters).unwrap();
    assert_eq!(unknown.issue_count, 1);
}

#[test]
fn recommendations_are_ranked_by_priority_then_count() {
    let analysis = CorrectionAnalyzer::new().analyze(&report());
    let recs = &analysis.recommendations;
    assert_eq!(recs.len(), 5);
    assert_eq!(
        recs[0],
        "CRITICAL: Missing Standard Output Parameters affects 2 calls in 2 procedures - \
         Add standard OUTPUT parameters p_Status INT and p_ErrorMsg VARCHAR(255) to all procedures"
    );
    assert!(recs[1].starts_with("CRITICAL: Missing Required Parameters affects 1 calls in 1 procedures"));
    assert!(recs[2].starts_with("HIGH: "));
    assert!(recs[3].starts_with("HIGH: "));
    assert!(recs[4].starts_with("MEDIUM: Unknown Parameters in C# Calls"));
}

#[test]
fn medium_recommendations_respect_limit() {
    let config = CorrectionConfig {
        medium_recommendation_limit: Some(0),
        ..CorrectionConfig::default()
    };
    let analysis = CorrectionAnalyzer::from_config(&config).analyze(&report());
    assert!(analysis.recommendations.iter().all(|r| !r.starts_with("MEDIUM")));
}

#[test]
fn clean_report_has_no_categories() {
    let report = CrossValidator::default().validate(&DefinitionCatalog::new(), Vec::new());
    let analysis = CorrectionAnalyzer::new().analyze(&report);
    assert!(analysis.categories.is_empty());
    assert!(analysis.recommendations.is_empty());
}

// ---- Actions ----

#[test]
fn actions_cover_critical_and_high_categories_only() {
    let analyzer = CorrectionAnalyzer::new();
    let actions = analyzer.generate_actions(&analyzer.analyze(&report()));

    let add_outputs: Vec<_> = actions
        .iter()
        .filter(|a| a.kind == CorrectionActionKind::AddOutputParameters)
        .collect();
    assert_eq!(add_outputs.len(), 2);
    assert_eq!(
        add_outputs[0].sql_changes[0],
        "ALTER PROCEDURE inv_inventory_Get_ByPartID ADD @p_Status INT OUTPUT, @p_ErrorMsg VARCHAR(255) OUTPUT"
    );
    assert!(!add_outputs[0].requires_manual_review);

    let fix = actions
        .iter()
        .find(|a| a.kind == CorrectionActionKind::FixParameterNames)
        .unwrap();
    assert_eq!(fix.source_file.as_deref(), Some("QuickButtons.cs"));
    assert_eq!(fix.line_number, Some(30));
    assert!(fix.requires_manual_review);
    assert_eq!(fix.code_changes, vec!["QuickButtons.cs:30: replace [\"p_Pos\"] with [\"p_Position\"]"]);

    let add_missing = actions
        .iter()
        .find(|a| a.kind == CorrectionActionKind::AddMissingParameters)
        .unwrap();
    assert_eq!(add_missing.line_number, Some(40));

    assert!(actions
        .iter()
        .any(|a| a.kind == CorrectionActionKind::RegisterProcedureDefinition));
    assert!(actions.iter().all(|a| a.priority <= 2));
}

#[test]
fn dry_run_reports_count_and_changes_nothing() {
    let analyzer = CorrectionAnalyzer::new();
    let actions = analyzer.generate_actions(&analyzer.analyze(&report()));
    assert_eq!(apply(&actions, true, analyzer.preview_limit()).unwrap(), actions.len());
}

#[test]
fn real_application_is_refused() {
    let analyzer = CorrectionAnalyzer::new();
    let actions = analyzer.generate_actions(&analyzer.analyze(&report()));
    let err = apply(&actions, false, 10).unwrap_err();
    assert!(matches!(err, CorrectionError::NotImplemented { actions: n } if n == actions.len()));
}

// ---- Plan ----

#[test]
fn plan_templates_and_call_corrections() {
    let report = report();
    let analyzer = CorrectionAnalyzer::new();
    let actions = analyzer.generate_actions(&analyzer.analyze(&report));
    let plan = CorrectionPlan::build(&report, &actions);

    assert_eq!(plan.initial_issue_count, report.summary.mismatched_calls);
    assert_eq!(plan.actions_generated, actions.len());
    assert_eq!(plan.procedures.len(), 2);
    assert!(plan.procedures[0].sql.contains("IN p_PartID INT,\n    OUT p_Status INT"));

    let quick = &plan.call_corrections["QuickButtons.cs"];
    assert!(quick
        .iter()
        .any(|c| c.description == "Fix parameter issue: Parameter 'p_Extra' not found in procedure definition"));
    assert_eq!(plan.call_correction_count(), report.summary.parameter_mismatch_count);

    let script = plan.render_sql_script();
    assert_eq!(script.matches("CREATE PROCEDURE").count(), 2);
    assert!(plan.summary_text().contains("Procedures To Standardize: 2"));
}

#[test]
fn plan_script_never_overwrites() {
    let report = report();
    let analyzer = CorrectionAnalyzer::new();
    let plan = CorrectionPlan::build(&report, &analyzer.generate_actions(&analyzer.analyze(&report)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("standardized.sql");
    plan.write_sql_script(&path).unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().contains("DELIMITER //"));
    assert!(matches!(
        plan.write_sql_script(&path),
        Err(CorrectionError::WriteFailed { .. })
    ));
}
