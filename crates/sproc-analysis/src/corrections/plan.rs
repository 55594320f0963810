//! Standardization plan: template procedures and call-site corrections.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use serde::Serialize;
use sproc_core::errors::CorrectionError;

use super::types::{CorrectionAction, CorrectionActionKind};
use crate::definitions::{ParameterDirection, ProcedureDefinition, ProcedureParameter};
use crate::validation::ValidationReport;

/// A procedure rewritten to the gateway calling convention.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedProcedure {
    pub procedure_name: String,
    /// Parameters of the new definition: the existing ones plus any
    /// missing standard outputs.
    pub parameters: Vec<ProcedureParameter>,
    pub sql: String,
}

/// One suggested C# edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterCorrection {
    pub source_file: String,
    pub line_number: usize,
    pub procedure_name: String,
    pub description: String,
}

/// Everything a reviewer needs to standardize the catalog, computed without
/// touching any file or database object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionPlan {
    pub initial_issue_count: usize,
    pub initial_parameter_issues: usize,
    pub actions_generated: usize,
    pub procedures: Vec<StandardizedProcedure>,
    /// Keyed by source file.
    pub call_corrections: BTreeMap<String, Vec<ParameterCorrection>>,
}

impl CorrectionPlan {
    pub fn build(report: &ValidationReport, actions: &[CorrectionAction]) -> Self {
        let procedures = actions
            .iter()
            .filter(|a| a.kind == CorrectionActionKind::AddOutputParameters)
            .map(|a| {
                let definition = report
                    .definitions
                    .iter()
                    .find(|d| d.name.eq_ignore_ascii_case(&a.procedure_name));
                standardize(&a.procedure_name, definition)
            })
            .collect();

        let mut call_corrections: BTreeMap<String, Vec<ParameterCorrection>> = BTreeMap::new();
        for finding in report.invalid_findings() {
            for issue in &finding.issues {
                call_corrections
                    .entry(finding.source_file.clone())
                    .or_default()
                    .push(ParameterCorrection {
                        source_file: finding.source_file.clone(),
                        line_number: finding.line_number,
                        procedure_name: finding.procedure_name.clone(),
                        description: format!("Fix parameter issue: {issue}"),
                    });
            }
        }

        Self {
            initial_issue_count: report.summary.mismatched_calls,
            initial_parameter_issues: report.summary.parameter_mismatch_count,
            actions_generated: actions.len(),
            procedures,
            call_corrections,
        }
    }

    pub fn call_correction_count(&self) -> usize {
        self.call_corrections.values().map(Vec::len).sum()
    }

    /// All standardized procedures as one script.
    pub fn render_sql_script(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "-- Standardized stored procedures");
        let _ = writeln!(out, "-- Review every procedure body before running this script.");
        for procedure in &self.procedures {
            let _ = writeln!(out);
            out.push_str(&procedure.sql);
            let _ = writeln!(out);
        }
        out
    }

    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Correction Plan (dry run)");
        let _ = writeln!(
            out,
            "Initial Issues: {} calls, {} parameter issues",
            self.initial_issue_count, self.initial_parameter_issues
        );
        let _ = writeln!(out, "Correction Actions Generated: {}", self.actions_generated);
        let _ = writeln!(out, "Procedures To Standardize: {}", self.procedures.len());
        let _ = writeln!(
            out,
            "C# Corrections: {} in {} files",
            self.call_correction_count(),
            self.call_corrections.len()
        );
        for (file, corrections) in &self.call_corrections {
            let _ = writeln!(out);
            let _ = writeln!(out, "{file}:");
            for c in corrections {
                let _ = writeln!(out, "  line {}: {}", c.line_number, c.description);
            }
        }
        out
    }

    /// Write the SQL script to a new file. An existing file is never
    /// overwritten.
    pub fn write_sql_script(&self, path: &Path) -> Result<(), CorrectionError> {
        let write_failed = |e: std::io::Error| CorrectionError::WriteFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(write_failed)?;
        file.write_all(self.render_sql_script().as_bytes()).map_err(write_failed)?;
        tracing::info!(path = %path.display(), procedures = self.procedures.len(), "wrote standardized procedures");
        Ok(())
    }
}

fn standardize(name: &str, definition: Option<&ProcedureDefinition>) -> StandardizedProcedure {
    let mut parameters: Vec<ProcedureParameter> = definition.map(|d| d.parameters.clone()).unwrap_or_default();
    for (output, ty) in [("p_Status", "INT"), ("p_ErrorMsg", "VARCHAR(255)")] {
        match parameters.iter_mut().find(|p| p.name.eq_ignore_ascii_case(output)) {
            Some(existing) => existing.direction = ParameterDirection::Out,
            None => parameters.push(ProcedureParameter::new(output, ty, ParameterDirection::Out)),
        }
    }

    let mut sql = String::new();
    let _ = writeln!(sql, "-- Standardized procedure: {name}");
    let _ = writeln!(sql, "DROP PROCEDURE IF EXISTS `{name}`;");
    let _ = writeln!(sql, "DELIMITER //");
    let _ = writeln!(sql);
    let _ = writeln!(sql, "CREATE PROCEDURE `{name}`(");
    let declared: Vec<String> = parameters
        .iter()
        .map(|p| format!("    {} {} {}", p.direction, p.name, p.param_type))
        .collect();
    let _ = writeln!(sql, "{}", declared.join(",\n"));
    let _ = writeln!(sql, ")");
    sql.push_str(
        "BEGIN
    DECLARE EXIT HANDLER FOR SQLEXCEPTION
    BEGIN
        ROLLBACK;
        GET DIAGNOSTICS CONDITION 1 p_Status = MYSQL_ERRNO, p_ErrorMsg = MESSAGE_TEXT;
        SET p_Status = -1;
    END;

    START TRANSACTION;

    -- Existing procedure body goes here.

    SET p_Status = 1;
    SET p_ErrorMsg = 'Success';
    COMMIT;
END //

DELIMITER ;
",
    );

    StandardizedProcedure {
        procedure_name: name.to_string(),
        parameters,
        sql,
    }
}
