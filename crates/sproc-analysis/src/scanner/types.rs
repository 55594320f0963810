//! Scanner types.

use std::path::PathBuf;
use std::time::Duration;

use sproc_core::config::ScanConfig;

/// Options for one directory walk.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory to walk.
    pub root: PathBuf,
    /// Include globs, matched against the path relative to `root`.
    /// Empty matches every file.
    pub patterns: Vec<String>,
    /// Additional ignore patterns (gitignore syntax).
    pub extra_ignores: Vec<String>,
    /// Files larger than this are skipped.
    pub max_file_size: u64,
}

impl ScanOptions {
    /// Options for the C# caller sources of a project.
    pub fn sources(config: &ScanConfig) -> Self {
        Self {
            root: config.effective_root(),
            patterns: config.effective_source_include(),
            extra_ignores: config.extra_ignore.clone(),
            max_file_size: config.effective_max_file_size(),
        }
    }

    /// Options for a directory of SQL scripts.
    pub fn sql(root: impl Into<PathBuf>, config: &ScanConfig) -> Self {
        Self {
            root: root.into(),
            patterns: vec!["**/*.sql".to_string()],
            extra_ignores: config.extra_ignore.clone(),
            max_file_size: config.effective_max_file_size(),
        }
    }
}

/// One file accepted by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the scan root, `/`-separated.
    pub path: String,
    /// Path on disk.
    pub absolute: PathBuf,
    pub size: u64,
}

/// Statistics from a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub total_files: usize,
    pub total_bytes: u64,
    pub dirs_skipped: usize,
    pub files_skipped: usize,
    pub duration: Duration,
}

/// Result of a directory walk.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub root: PathBuf,
    /// Accepted files, sorted by relative path.
    pub files: Vec<SourceFile>,
    pub stats: ScanStats,
}
