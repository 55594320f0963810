//! Call-site extractor: gateway invocations in C# sources.
//!
//! The tree-sitter locator handles files that parse cleanly; anything the
//! grammar rejects goes through the lexical locator instead. Both feed the
//! same argument interpretation, so a call looks the same whichever
//! locator found it.

mod csharp;
mod lexical;
mod parameters;
mod syntax;
mod types;

use std::fs;

use sproc_core::config::ValidationConfig;
use sproc_core::errors::{ExtractionError, PipelineResult};

pub use types::{GatewayPattern, ParameterSource, ProcedureCall};

use csharp::CSharpCallLocator;
use lexical::LexicalCallLocator;
use parameters::read_parameter_map;
use syntax::{string_literal, strip_argument_name};
use types::RawCall;

use crate::scanner::SourceFile;

pub struct CallSiteExtractor {
    pattern: GatewayPattern,
    csharp: Option<CSharpCallLocator>,
    grammar_error: Option<String>,
    lexical: LexicalCallLocator,
}

impl CallSiteExtractor {
    pub fn new(pattern: GatewayPattern) -> Self {
        let (csharp, grammar_error) = match CSharpCallLocator::new() {
            Ok(locator) => (Some(locator), None),
            Err(e) => {
                tracing::warn!(error = %e, "C# grammar unavailable; using lexical call scanning only");
                (None, Some(e.to_string()))
            }
        };
        let lexical = LexicalCallLocator::new(&pattern);
        Self {
            pattern,
            csharp,
            grammar_error,
            lexical,
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(GatewayPattern::from_config(config))
    }

    pub fn pattern(&self) -> &GatewayPattern {
        &self.pattern
    }

    /// Whether the C# grammar loaded. When it did not, every file is
    /// scanned lexically.
    pub fn has_syntax_tree_locator(&self) -> bool {
        self.csharp.is_some()
    }

    /// Extract the gateway calls in one C# source. `file` is recorded on
    /// every call as given.
    pub fn extract(&mut self, source: &str, file: &str) -> PipelineResult<Vec<ProcedureCall>> {
        let mut result: PipelineResult<Vec<ProcedureCall>> = PipelineResult::default();

        let located = self
            .csharp
            .as_mut()
            .and_then(|locator| locator.locate(source, &self.pattern));
        let raw_calls = match located {
            Some(calls) => calls,
            None => {
                tracing::debug!(file, "syntax errors in source; scanning lexically");
                self.lexical.locate(source)
            }
        };

        for raw in raw_calls {
            if let Some(call) = build_call(raw, source, file, &mut result) {
                result.data.push(call);
            }
        }
        result
    }

    /// Read and extract C# files. Unreadable files are skipped with a
    /// `ReadFailed` warning.
    pub fn extract_files(&mut self, files: &[SourceFile]) -> PipelineResult<Vec<ProcedureCall>> {
        let mut result: PipelineResult<Vec<ProcedureCall>> = PipelineResult::default();
        if let Some(message) = &self.grammar_error {
            result.add_error(ExtractionError::Grammar {
                message: message.clone(),
            });
        }

        for file in files {
            let bytes = match fs::read(&file.absolute) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(file = file.path.as_str(), error = %e, "skipping unreadable source file");
                    result.add_error(ExtractionError::ReadFailed {
                        path: file.path.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&bytes);
            let source = text.strip_prefix('\u{feff}').unwrap_or(&text);

            let extracted = self.extract(source, &file.path);
            let calls = result.absorb(extracted);
            if !calls.is_empty() {
                tracing::debug!(file = file.path.as_str(), calls = calls.len(), "gateway calls found");
            }
            result.data.extend(calls);
        }

        tracing::info!(
            files = files.len(),
            calls = result.data.len(),
            warnings = result.error_count(),
            "procedure call sites extracted"
        );
        result
    }
}

impl Default for CallSiteExtractor {
    fn default() -> Self {
        Self::new(GatewayPattern::default())
    }
}

/// Interpret the arguments of a located call. The procedure name is the
/// first string-literal argument and the parameter map is the one after it.
fn build_call(
    raw: RawCall,
    source: &str,
    file: &str,
    result: &mut PipelineResult<Vec<ProcedureCall>>,
) -> Option<ProcedureCall> {
    let arguments: Vec<&str> = raw.arguments.iter().map(|a| strip_argument_name(a)).collect();

    let Some((name_index, procedure_name)) = arguments
        .iter()
        .enumerate()
        .find_map(|(i, a)| string_literal(a).map(|name| (i, name)))
    else {
        tracing::debug!(file, line = raw.line, method = raw.method.as_str(), "call without a literal procedure name");
        result.add_error(ExtractionError::MalformedCall {
            file: file.to_string(),
            line: raw.line,
            message: format!("{} call has no literal procedure name", raw.method),
        });
        return None;
    };

    let map = match read_parameter_map(arguments.get(name_index + 1).copied(), source, raw.offset) {
        Ok(map) => map,
        Err((map, reason)) => {
            tracing::warn!(
                file,
                line = raw.line,
                procedure = procedure_name.as_str(),
                reason = reason.as_str(),
                "parameter map not readable; recording call without parameters"
            );
            result.add_error(ExtractionError::MalformedCall {
                file: file.to_string(),
                line: raw.line,
                message: reason,
            });
            map
        }
    };

    Some(ProcedureCall {
        procedure_name,
        source_file: file.to_string(),
        line_number: raw.line,
        method: raw.method,
        supplied_parameters: map.entries,
        parameter_source: map.source,
    })
}
