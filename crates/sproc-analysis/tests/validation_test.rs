//! Cross-validation rules and report rendering.

use std::collections::BTreeMap;

use sproc_analysis::call_sites::{ParameterSource, ProcedureCall};
use sproc_analysis::definitions::{DefinitionCatalog, ParameterDirection, ProcedureDefinition, ProcedureParameter};
use sproc_analysis::validation::{CrossValidator, NameNormalizer, ValidationIssue};

fn param(name: &str, direction: ParameterDirection) -> ProcedureParameter {
    let ty = if name == "p_ErrorMsg" { "VARCHAR(255)" } else { "INT" };
    ProcedureParameter::new(name, ty, direction)
}

fn quickbuttons_catalog() -> DefinitionCatalog {
    [ProcedureDefinition {
        name: "qb_quickbuttons_Save".to_string(),
        parameters: vec![
            param("p_UserID", ParameterDirection::In),
            param("p_Position", ParameterDirection::In),
            param("p_Status", ParameterDirection::Out),
            param("p_ErrorMsg", ParameterDirection::Out),
        ],
        source_file: "quickbuttons.sql".to_string(),
    }]
    .into_iter()
    .collect()
}

fn call(procedure: &str, keys: &[&str]) -> ProcedureCall {
    ProcedureCall {
        procedure_name: procedure.to_string(),
        source_file: "Services/QuickButtons.cs".to_string(),
        line_number: 42,
        method: "ExecuteWithStatus".to_string(),
        supplied_parameters: keys
            .iter()
            .map(|k| (k.to_string(), "value".to_string()))
            .collect::<BTreeMap<_, _>>(),
        parameter_source: ParameterSource::Inline,
    }
}

// ---- Rules ----

#[test]
fn complete_call_is_valid() {
    let finding = CrossValidator::default().validate_call(
        &call("qb_quickbuttons_Save", &["p_UserID", "p_Position"]),
        &quickbuttons_catalog(),
    );
    assert!(finding.is_valid);
    assert!(finding.issues.is_empty());
    assert_eq!(finding.line_number, 42);
}

#[test]
fn missing_required_parameter_is_one_issue() {
    let finding = CrossValidator::default().validate_call(&call("qb_quickbuttons_Save", &["p_UserID"]), &quickbuttons_catalog());
    assert!(!finding.is_valid);
    assert_eq!(finding.issues.len(), 1);
    assert_eq!(finding.issues[0].to_string(), "Required parameter 'p_Position' not found in call");
}

#[test]
fn unknown_parameter_is_one_issue() {
    let finding = CrossValidator::default().validate_call(
        &call("qb_quickbuttons_Save", &["p_UserID", "p_Position", "p_Extra"]),
        &quickbuttons_catalog(),
    );
    assert!(!finding.is_valid);
    assert_eq!(
        finding.issues,
        vec![ValidationIssue::UnknownParameter {
            parameter: "p_Extra".to_string()
        }]
    );
    assert_eq!(finding.issues[0].to_string(), "Parameter 'p_Extra' not found in procedure definition");
}

#[test]
fn unknown_procedure_reports_only_that() {
    let finding = CrossValidator::default().validate_call(&call("qb_quickbuttons_Delete", &["p_Anything"]), &quickbuttons_catalog());
    assert!(!finding.is_valid);
    assert_eq!(finding.issues.len(), 1);
    assert_eq!(
        finding.issues[0].to_string(),
        "Stored procedure 'qb_quickbuttons_Delete' not found in SQL definitions"
    );
}

#[test]
fn procedure_lookup_ignores_case() {
    let finding = CrossValidator::default().validate_call(
        &call("QB_QUICKBUTTONS_SAVE", &["p_UserID", "p_Position"]),
        &quickbuttons_catalog(),
    );
    assert!(finding.is_valid);
}

#[test]
fn prefix_normalization_both_ways() {
    let catalog: DefinitionCatalog = [
        ProcedureDefinition {
            name: "inv_inventory_Get_ByPartID".to_string(),
            parameters: vec![
                param("p_PartID", ParameterDirection::In),
                param("p_Status", ParameterDirection::Out),
                param("p_ErrorMsg", ParameterDirection::Out),
            ],
            source_file: "a.sql".to_string(),
        },
        ProcedureDefinition {
            name: "inv_location_Get".to_string(),
            parameters: vec![
                param("Location", ParameterDirection::In),
                param("p_Status", ParameterDirection::Out),
                param("p_ErrorMsg", ParameterDirection::Out),
            ],
            source_file: "a.sql".to_string(),
        },
    ]
    .into_iter()
    .collect();

    let validator = CrossValidator::default();
    assert!(validator.validate_call(&call("inv_inventory_Get_ByPartID", &["PartID"]), &catalog).is_valid);
    assert!(validator.validate_call(&call("inv_location_Get", &["p_Location"]), &catalog).is_valid);
    assert!(validator.validate_call(&call("inv_location_Get", &["@Location"]), &catalog).is_valid);

    let strict = CrossValidator::new(NameNormalizer::exact());
    assert!(!strict.validate_call(&call("inv_inventory_Get_ByPartID", &["PartID"]), &catalog).is_valid);
}

#[test]
fn missing_standard_outputs_flagged_even_when_parameters_match() {
    let catalog: DefinitionCatalog = [ProcedureDefinition {
        name: "inv_inventory_Get_ByPartID".to_string(),
        parameters: vec![param("p_PartID", ParameterDirection::In)],
        source_file: "a.sql".to_string(),
    }]
    .into_iter()
    .collect();

    let finding = CrossValidator::default().validate_call(&call("inv_inventory_Get_ByPartID", &["p_PartID"]), &catalog);
    assert!(!finding.is_valid);
    let issues: Vec<String> = finding.issues.iter().map(ToString::to_string).collect();
    assert_eq!(
        issues,
        vec![
            "Missing standard p_Status OUTPUT parameter",
            "Missing standard p_ErrorMsg OUTPUT parameter"
        ]
    );

    let relaxed = CrossValidator::default().require_standard_outputs(false);
    assert!(relaxed.validate_call(&call("inv_inventory_Get_ByPartID", &["p_PartID"]), &catalog).is_valid);
}

#[test]
fn inout_parameters_are_required_but_not_standard_outputs() {
    let catalog: DefinitionCatalog = [ProcedureDefinition {
        name: "sys_counter_Next".to_string(),
        parameters: vec![
            param("p_Counter", ParameterDirection::InOut),
            param("p_Status", ParameterDirection::InOut),
            param("p_ErrorMsg", ParameterDirection::Out),
        ],
        source_file: "a.sql".to_string(),
    }]
    .into_iter()
    .collect();

    let finding = CrossValidator::default().validate_call(&call("sys_counter_Next", &["p_Counter"]), &catalog);
    assert_eq!(
        finding.issues,
        vec![
            ValidationIssue::MissingRequiredParameter {
                parameter: "p_Status".to_string()
            },
            ValidationIssue::MissingStandardOutput {
                parameter: "p_Status".to_string()
            },
        ]
    );
}

// ---- Report ----

#[test]
fn summary_counts_are_stable_across_runs() {
    let catalog = quickbuttons_catalog();
    let calls = vec![
        call("qb_quickbuttons_Save", &["p_UserID", "p_Position"]),
        call("qb_quickbuttons_Save", &["p_UserID"]),
        call("qb_quickbuttons_Save", &["p_UserID", "p_Slot"]),
        call("missing_proc", &[]),
    ];
    let validator = CrossValidator::default();
    let first = validator.validate(&catalog, calls.clone());
    let second = validator.validate(&catalog, calls);

    assert_eq!(first.summary, second.summary);
    assert_eq!(first.summary.total_procedures, 1);
    assert_eq!(first.summary.total_calls, 4);
    assert_eq!(first.summary.mismatched_calls, 3);
    assert_eq!(first.summary.parameter_mismatch_count, 4);
}

#[test]
fn summary_text_lists_invalid_calls() {
    let report = CrossValidator::default().validate(
        &quickbuttons_catalog(),
        vec![
            call("qb_quickbuttons_Save", &["p_UserID", "p_Position"]),
            call("qb_quickbuttons_Save", &["p_UserID"]),
        ],
    );
    let text = report.to_summary_text();
    assert!(text.contains("SUMMARY STATISTICS:"));
    assert!(text.contains("- Mismatched Calls: 1"));
    assert!(text.contains("VALIDATION RESULTS:"));
    assert!(text.contains("File: Services/QuickButtons.cs:42"));
    assert!(text.contains("  - Required parameter 'p_Position' not found in call"));
}

#[test]
fn json_report_uses_issue_strings() {
    let report = CrossValidator::default().validate(&quickbuttons_catalog(), vec![call("qb_quickbuttons_Save", &["p_UserID"])]);
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["summary"]["mismatchedCalls"], 1);
    assert_eq!(
        json["findings"][0]["issues"][0],
        "Required parameter 'p_Position' not found in call"
    );
    assert_eq!(json["definitions"][0]["parameters"][0]["direction"], "IN");
}
