//! Scan configuration: where SQL definitions and C# callers live.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the source scanner.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Project root; call-site paths are reported relative to it.
    pub root: Option<PathBuf>,
    /// SQL files or directories holding procedure definitions.
    #[serde(default)]
    pub sql_paths: Vec<PathBuf>,
    /// Include globs for caller source. Default: `["**/*.cs"]`.
    #[serde(default)]
    pub source_include: Vec<String>,
    /// Additional ignore patterns (gitignore syntax).
    #[serde(default)]
    pub extra_ignore: Vec<String>,
    /// Maximum file size in bytes. Default: 5 MB.
    pub max_file_size: Option<u64>,
}

impl ScanConfig {
    pub fn effective_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn effective_source_include(&self) -> Vec<String> {
        if self.source_include.is_empty() {
            vec!["**/*.cs".to_string()]
        } else {
            self.source_include.clone()
        }
    }

    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(5 * 1024 * 1024)
    }
}
