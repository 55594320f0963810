//! Call-against-definition rules.

use sproc_core::config::SprocConfig;

use super::normalize::NameNormalizer;
use super::report::ValidationReport;
use super::types::{ValidationFinding, ValidationIssue};
use crate::call_sites::ProcedureCall;
use crate::definitions::{DefinitionCatalog, ProcedureDefinition};

/// Checks calls against the definition catalog.
///
/// Rules, in the order their issues are reported:
/// 1. the procedure must exist (if not, no other rule runs);
/// 2. every IN/INOUT parameter must be supplied;
/// 3. every supplied key must name a parameter;
/// 4. the definition must declare the standard status outputs.
#[derive(Debug, Clone)]
pub struct CrossValidator {
    normalizer: NameNormalizer,
    require_standard_outputs: bool,
    standard_outputs: Vec<String>,
}

impl CrossValidator {
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self {
            normalizer,
            require_standard_outputs: true,
            standard_outputs: vec!["p_Status".to_string(), "p_ErrorMsg".to_string()],
        }
    }

    pub fn from_config(config: &SprocConfig) -> Self {
        Self {
            normalizer: NameNormalizer::from_config(&config.validation),
            require_standard_outputs: config.validation.effective_require_standard_outputs(),
            standard_outputs: vec![
                config.database.effective_status_parameter().to_string(),
                config.database.effective_error_message_parameter().to_string(),
            ],
        }
    }

    pub fn require_standard_outputs(mut self, require: bool) -> Self {
        self.require_standard_outputs = require;
        self
    }

    pub fn validate_call(&self, call: &ProcedureCall, catalog: &DefinitionCatalog) -> ValidationFinding {
        let issues = match catalog.get(&call.procedure_name) {
            None => vec![ValidationIssue::ProcedureNotFound {
                procedure: call.procedure_name.clone(),
            }],
            Some(definition) => self.check(call, definition),
        };

        ValidationFinding {
            procedure_name: call.procedure_name.clone(),
            source_file: call.source_file.clone(),
            line_number: call.line_number,
            is_valid: issues.is_empty(),
            issues,
        }
    }

    /// Validate every call. The report owns snapshots of both catalogs.
    pub fn validate(&self, catalog: &DefinitionCatalog, calls: Vec<ProcedureCall>) -> ValidationReport {
        let findings: Vec<ValidationFinding> = calls.iter().map(|call| self.validate_call(call, catalog)).collect();
        let report = ValidationReport::new(catalog.as_slice().to_vec(), calls, findings);

        tracing::info!(
            procedures = report.summary.total_procedures,
            calls = report.summary.total_calls,
            mismatches = report.summary.mismatched_calls,
            issues = report.summary.parameter_mismatch_count,
            "validation complete"
        );
        report
    }

    fn check(&self, call: &ProcedureCall, definition: &ProcedureDefinition) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for parameter in definition.input_parameters() {
            let supplied = call
                .supplied_parameters
                .keys()
                .any(|key| self.normalizer.same(key, &parameter.name));
            if !supplied {
                issues.push(ValidationIssue::MissingRequiredParameter {
                    parameter: parameter.name.clone(),
                });
            }
        }

        for key in call.supplied_parameters.keys() {
            let declared = definition
                .parameters
                .iter()
                .any(|p| self.normalizer.same(key, &p.name));
            if !declared {
                issues.push(ValidationIssue::UnknownParameter { parameter: key.clone() });
            }
        }

        if self.require_standard_outputs {
            for output in &self.standard_outputs {
                if !definition.declares_output(output) {
                    issues.push(ValidationIssue::MissingStandardOutput {
                        parameter: output.clone(),
                    });
                }
            }
        }

        issues
    }
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(NameNormalizer::default())
    }
}
