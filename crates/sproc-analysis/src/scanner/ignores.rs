//! Default ignore patterns for .NET solutions.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Directories never scanned for call sites.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    // Build output
    "bin",
    "obj",
    "TestResults",
    // Package caches
    "packages",
    ".nuget",
    "node_modules",
    // Docs and tooling
    "Documentation",
    // Version control / IDE
    ".git",
    ".svn",
    ".vs",
    ".vscode",
    ".idea",
];

/// Generated files that never contain hand-written gateway calls.
pub const DEFAULT_IGNORE_FILES: &[&str] = &[
    "*.g.cs",
    "*.g.i.cs",
    "*.designer.cs",
    "*.AssemblyInfo.cs",
    "*.AssemblyAttributes.cs",
];

/// Compiled ignore rules: defaults, extra patterns, and the project `.gitignore`.
pub struct IgnorePatterns {
    gitignore: Gitignore,
}

impl IgnorePatterns {
    pub fn new(root: &Path, extra_patterns: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(root);
        let _ = builder.case_insensitive(true);

        for pattern in DEFAULT_IGNORE_DIRS
            .iter()
            .chain(DEFAULT_IGNORE_FILES)
            .map(|p| p.to_string())
            .chain(extra_patterns.iter().cloned())
        {
            if let Err(e) = builder.add_line(None, &pattern) {
                tracing::warn!(pattern = pattern.as_str(), error = %e, "ignoring invalid ignore pattern");
            }
        }

        let gitignore = root.join(".gitignore");
        if gitignore.exists() {
            if let Some(e) = builder.add(&gitignore) {
                tracing::warn!(error = %e, "could not fully read .gitignore");
            }
        }

        let gitignore = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to empty ignore set");
            Gitignore::empty()
        });
        Self { gitignore }
    }

    /// Check if a path (relative to the root) should be ignored.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.gitignore
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}
