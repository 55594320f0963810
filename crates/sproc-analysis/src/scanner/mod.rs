//! Source scanner: gitignore-aware directory walking with include globs.

mod ignores;
mod types;
mod walker;

pub use ignores::{IgnorePatterns, DEFAULT_IGNORE_DIRS, DEFAULT_IGNORE_FILES};
pub use types::{ScanOptions, ScanResult, ScanStats, SourceFile};
pub use walker::Scanner;

pub(crate) use walker::relative_display;
