//! End-to-end validation runs over fixture trees.

use std::fs;
use std::path::{Path, PathBuf};

use sproc_analysis::call_sites::ParameterSource;
use sproc_analysis::pipeline::ValidationPipeline;
use sproc_core::config::SprocConfig;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config_for(root: &Path, sql_paths: &[&str]) -> SprocConfig {
    let mut config = SprocConfig::default();
    config.scan.root = Some(root.to_path_buf());
    config.scan.sql_paths = sql_paths.iter().map(PathBuf::from).collect();
    config
}

#[test]
fn fixture_project_validates() {
    let result = ValidationPipeline::new(config_for(&fixtures(), &["sql"])).run();
    assert!(result.is_clean(), "unexpected warnings: {:?}", result.errors);
    let report = result.data;

    assert_eq!(report.summary.total_procedures, 4);
    assert_eq!(report.summary.total_calls, 5, "bin/ must not be scanned");
    assert_eq!(report.summary.mismatched_calls, 3);
    assert_eq!(report.summary.parameter_mismatch_count, 5);

    let note = report
        .calls
        .iter()
        .find(|c| c.procedure_name == "inv_inventory_Update_Note")
        .unwrap();
    assert_eq!(note.source_file, "src/Services/InventoryService.cs");
    assert_eq!(note.parameter_source, ParameterSource::Variable("parameters".to_string()));

    let definition = report
        .definitions
        .iter()
        .find(|d| d.name == "qb_quickbuttons_Save")
        .unwrap();
    assert_eq!(definition.source_file, "sql/quickbuttons.sql");
    assert_eq!(definition.parameters.len(), 4);

    let invalid: Vec<&str> = report.invalid_findings().map(|f| f.procedure_name.as_str()).collect();
    assert_eq!(
        invalid,
        vec!["inv_inventory_Get_ByPartID", "qb_quickbuttons_Save", "inv_inventory_Archive"]
    );
}

#[test]
fn bad_fragments_become_warnings() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("schema.sql"),
        "CREATE PROCEDURE broken(IN) BEGIN END;\nCREATE PROCEDURE ok_proc(IN p_A INT, OUT p_Status INT, OUT p_ErrorMsg VARCHAR(255)) BEGIN END;",
    )
    .unwrap();
    fs::write(
        dir.path().join("Dao.cs"),
        "class Dao { void Run() { Helper_Database_StoredProcedure.ExecuteNonQuery(c, \"ok_proc\", new Dictionary<string, object> { [\"A\"] = 1 }); } }",
    )
    .unwrap();

    let result = ValidationPipeline::new(config_for(dir.path(), &[])).run();
    assert_eq!(result.error_count(), 1);
    let report = &result.data;
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.summary.total_procedures, 1);
    assert_eq!(report.summary.total_calls, 1);
    assert!(report.findings[0].is_valid);
}

#[test]
fn missing_sql_path_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let result = ValidationPipeline::new(config_for(dir.path(), &["does-not-exist.sql"])).run();
    assert_eq!(result.error_count(), 1);
    assert_eq!(result.data.summary.total_calls, 0);
}
