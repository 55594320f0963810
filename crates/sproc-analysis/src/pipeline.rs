//! End-to-end validation run: scan, extract, validate.

use std::fs;
use std::path::{Path, PathBuf};

use sproc_core::config::SprocConfig;
use sproc_core::errors::{ExtractionError, PipelineResult};

use crate::call_sites::CallSiteExtractor;
use crate::definitions::DefinitionExtractor;
use crate::scanner::{relative_display, ScanOptions, Scanner, SourceFile};
use crate::validation::{CrossValidator, ValidationReport};

/// One batch validation over a snapshot of the project sources.
pub struct ValidationPipeline {
    config: SprocConfig,
}

impl ValidationPipeline {
    pub fn new(config: SprocConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SprocConfig {
        &self.config
    }

    /// Run every stage. Unreadable files and malformed fragments are
    /// collected as warnings; the report covers everything else.
    pub fn run(&self) -> PipelineResult<ValidationReport> {
        let root = self.config.scan.effective_root();
        tracing::info!(root = %root.display(), "starting stored procedure validation");

        let mut result: PipelineResult<ValidationReport> = PipelineResult::default();

        let sql_scan = self.sql_files(&root);
        let sql_files = result.absorb(sql_scan);
        let definitions = DefinitionExtractor::new().extract_files(&sql_files);
        let catalog = result.absorb(definitions);

        let source_scan = Scanner::new(ScanOptions::sources(&self.config.scan)).scan();
        let sources = result.absorb(source_scan);
        let mut extractor = CallSiteExtractor::from_config(&self.config.validation);
        let extracted = extractor.extract_files(&sources.files);
        let calls = result.absorb(extracted);

        let mut report = CrossValidator::from_config(&self.config).validate(&catalog, calls);
        report.warnings = result.errors.iter().map(ToString::to_string).collect();
        if !report.warnings.is_empty() {
            tracing::warn!(warnings = report.warnings.len(), "validation finished with extraction warnings");
        }

        result.data = report;
        result
    }

    /// SQL files named by `scan.sql_paths`, or every `*.sql` under the root
    /// when none are configured. Paths are reported relative to the root.
    fn sql_files(&self, root: &Path) -> PipelineResult<Vec<SourceFile>> {
        let mut result: PipelineResult<Vec<SourceFile>> = PipelineResult::default();
        let configured: Vec<PathBuf> = if self.config.scan.sql_paths.is_empty() {
            vec![root.to_path_buf()]
        } else {
            self.config
                .scan
                .sql_paths
                .iter()
                .map(|p| if p.is_absolute() { p.clone() } else { root.join(p) })
                .collect()
        };

        for path in configured {
            if path.is_dir() {
                let scanned = Scanner::new(ScanOptions::sql(&path, &self.config.scan)).scan();
                let scan = result.absorb(scanned);
                result.data.extend(scan.files.into_iter().map(|f| SourceFile {
                    path: relative_display(&f.absolute, root),
                    ..f
                }));
            } else {
                match fs::metadata(&path) {
                    Ok(meta) => result.data.push(SourceFile {
                        path: relative_display(&path, root),
                        absolute: path,
                        size: meta.len(),
                    }),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "SQL path not readable");
                        result.add_error(ExtractionError::ReadFailed {
                            path: path.display().to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
        result
    }
}
