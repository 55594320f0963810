//! Sequential directory walker using ignore + globset.

use std::fs;
use std::path::Path;
use std::time::Instant;

use globset::{Glob, GlobSet, GlobSetBuilder};
use sproc_core::errors::{ExtractionError, PipelineResult};

use super::ignores::IgnorePatterns;
use super::types::{ScanOptions, ScanResult, ScanStats, SourceFile};

/// Gitignore-aware file collector.
pub struct Scanner {
    options: ScanOptions,
    ignores: IgnorePatterns,
    include_globs: GlobSet,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        let ignores = IgnorePatterns::new(&options.root, &options.extra_ignores);

        let mut builder = GlobSetBuilder::new();
        for pattern in &options.patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!(pattern = pattern.as_str(), error = %e, "skipping invalid include glob"),
            }
        }
        let include_globs = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "include globs failed to compile; matching every file");
            GlobSet::empty()
        });

        Self {
            options,
            ignores,
            include_globs,
        }
    }

    /// Walk the root. Unreadable directories become `ReadFailed` warnings.
    pub fn scan(&self) -> PipelineResult<ScanResult> {
        let start = Instant::now();
        let mut result = PipelineResult::new(ScanResult {
            root: self.options.root.clone(),
            ..ScanResult::default()
        });
        let mut stats = ScanStats::default();
        let mut files = Vec::new();

        if self.options.root.is_file() {
            self.accept_file(&self.options.root, &mut files, &mut stats, &mut result);
        } else {
            self.walk_dir(&self.options.root, &mut files, &mut stats, &mut result);
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        stats.total_files = files.len();
        stats.total_bytes = files.iter().map(|f| f.size).sum();
        stats.duration = start.elapsed();

        tracing::debug!(
            root = %self.options.root.display(),
            files = stats.total_files,
            skipped = stats.files_skipped,
            "scan complete"
        );

        result.data.files = files;
        result.data.stats = stats;
        result
    }

    fn walk_dir(
        &self,
        dir: &Path,
        files: &mut Vec<SourceFile>,
        stats: &mut ScanStats,
        result: &mut PipelineResult<ScanResult>,
    ) {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                result.add_error(ExtractionError::ReadFailed {
                    path: dir.display().to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let relative = path.strip_prefix(&self.options.root).unwrap_or(&path);
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            // Symlinked directories are never followed; they can loop back
            // into their own ancestors.
            if file_type.is_symlink() && path.is_dir() {
                tracing::debug!(dir = %path.display(), "skipping symlinked directory");
                stats.dirs_skipped += 1;
            } else if file_type.is_dir() {
                if self.ignores.is_ignored(relative, true) {
                    stats.dirs_skipped += 1;
                } else {
                    self.walk_dir(&path, files, stats, result);
                }
            } else if path.is_file() {
                if self.ignores.is_ignored(relative, false) {
                    stats.files_skipped += 1;
                } else if self.include_globs.is_empty() || self.include_globs.is_match(relative) {
                    self.accept_file(&path, files, stats, result);
                }
            }
        }
    }

    fn accept_file(
        &self,
        path: &Path,
        files: &mut Vec<SourceFile>,
        stats: &mut ScanStats,
        result: &mut PipelineResult<ScanResult>,
    ) {
        let size = match fs::metadata(path) {
            Ok(m) => m.len(),
            Err(e) => {
                result.add_error(ExtractionError::ReadFailed {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        if size > self.options.max_file_size {
            tracing::debug!(file = %path.display(), size, "skipping oversized file");
            stats.files_skipped += 1;
            return;
        }

        files.push(SourceFile {
            path: relative_display(path, &self.options.root),
            absolute: path.to_path_buf(),
            size,
        });
    }
}

/// `path` relative to `root` with `/` separators; the full path when it is
/// not under `root`, or when it is `root` itself.
pub(crate) fn relative_display(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        _ => path.to_string_lossy().replace('\\', "/"),
    }
}
