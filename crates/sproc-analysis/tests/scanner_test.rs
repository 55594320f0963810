//! Scanner tests: include globs, default ignores, and symlinked directories.

use std::fs;
use std::path::Path;

use sproc_analysis::scanner::{ScanOptions, Scanner};
use sproc_core::config::ScanConfig;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sql_scan(root: &Path) -> Vec<String> {
    let result = Scanner::new(ScanOptions::sql(root, &ScanConfig::default())).scan();
    assert!(result.is_clean(), "unexpected warnings: {:?}", result.errors);
    result.data.files.into_iter().map(|f| f.path).collect()
}

// ---- Globs and ignores ----

#[test]
fn only_matching_files_outside_ignored_dirs() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "db/inventory.sql", "CREATE PROCEDURE a() BEGIN END;");
    write(dir.path(), "db/readme.md", "notes");
    write(dir.path(), "bin/Debug/copy.sql", "CREATE PROCEDURE a() BEGIN END;");

    assert_eq!(sql_scan(dir.path()), vec!["db/inventory.sql".to_string()]);
}

// ---- Symlinks ----

#[cfg(unix)]
#[test]
fn symlink_back_to_ancestor_is_not_followed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a/x.sql", "CREATE PROCEDURE x() BEGIN END;");
    std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("a/loop")).unwrap();

    let files = sql_scan(dir.path());
    assert_eq!(files, vec!["a/x.sql".to_string()], "each file must be reported once");
}

#[cfg(unix)]
#[test]
fn symlinked_file_is_still_accepted() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shared/common.sql", "CREATE PROCEDURE c() BEGIN END;");
    fs::create_dir_all(dir.path().join("db")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("shared/common.sql"), dir.path().join("db/common.sql")).unwrap();

    let files = sql_scan(dir.path());
    assert_eq!(files, vec!["db/common.sql".to_string(), "shared/common.sql".to_string()]);
}
