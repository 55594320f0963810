//! Stored-procedures-only policy guard.
//!
//! A heuristic, not a SQL parser: the procedure-name argument is scanned
//! for SQL keywords standing as whole words (an identifier character on
//! neither side), and must otherwise look like a plain, optionally
//! schema-qualified, identifier. Rejection happens before any connection
//! is opened.

use std::sync::LazyLock;

use regex::Regex;
use sproc_core::errors::GatewayError;
use sproc_core::tracing::setup::SECURITY_TARGET;

/// Keywords that mark an argument as inline SQL rather than a procedure name.
pub const SQL_KEYWORDS: &[&str] = &[
    "select", "insert", "update", "delete", "drop", "create", "alter", "truncate", "grant",
    "revoke", "union", "join", "where", "from", "into", "values", "set", "exec", "execute",
];

static KEYWORD_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = SQL_KEYWORDS.join("|");
    Regex::new(&format!(r"(?i)(?:^|[^A-Za-z0-9_$])({alternation})(?:[^A-Za-z0-9_$]|$)"))
        .expect("keyword pattern is valid")
});

static PROCEDURE_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^`?[A-Za-z0-9_$]+`?(?:\.`?[A-Za-z0-9_$]+`?)?$").expect("identifier pattern is valid")
});

/// The first SQL keyword found standing as its own token, lowercased.
pub fn find_sql_keyword(name: &str) -> Option<String> {
    KEYWORD_TOKEN
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Validate a procedure-name argument. Violations are logged as security
/// events under the `sproc::security` target.
pub fn check_procedure_name(name: &str) -> Result<(), GatewayError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::EmptyProcedureName);
    }

    let reason = if let Some(keyword) = find_sql_keyword(trimmed) {
        format!("contains SQL keyword '{keyword}'; only stored procedure names are allowed")
    } else if !PROCEDURE_IDENT.is_match(trimmed) {
        "is not a valid stored procedure identifier".to_string()
    } else {
        return Ok(());
    };

    tracing::error!(
        target: SECURITY_TARGET,
        procedure = trimmed,
        reason = reason.as_str(),
        "rejected non-procedure database call"
    );
    Err(GatewayError::PolicyViolation {
        procedure: trimmed.to_string(),
        reason,
    })
}
