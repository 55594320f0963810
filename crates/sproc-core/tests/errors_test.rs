//! Tests for error codes and classification.

use sproc_core::errors::{
    error_code, ConfigError, CorrectionError, ExtractionError, GatewayError, PipelineError,
    PipelineResult, SprocErrorCode,
};

#[test]
fn test_gateway_error_codes() {
    let policy = GatewayError::PolicyViolation {
        procedure: "SELECT 1".into(),
        reason: "contains SQL keyword 'select'".into(),
    };
    assert_eq!(policy.error_code(), error_code::POLICY_VIOLATION);
    assert!(policy.is_policy_violation());

    let deadlock = GatewayError::Database {
        code: 1213,
        message: "Deadlock found".into(),
    };
    assert_eq!(deadlock.error_code(), error_code::TRANSIENT_DB_ERROR);

    let syntax = GatewayError::Database {
        code: 1064,
        message: "syntax".into(),
    };
    assert_eq!(syntax.error_code(), error_code::DB_ERROR);
}

#[test]
fn test_transient_classification_uses_allow_list() {
    let codes = [1205, 1213, 2006, 2013];
    let gone = GatewayError::Connection {
        code: Some(2006),
        message: "MySQL server has gone away".into(),
    };
    assert!(gone.is_transient(&codes));
    assert!(!gone.is_transient(&[1205]));

    let refused = GatewayError::Connection {
        code: None,
        message: "refused".into(),
    };
    assert!(!refused.is_transient(&codes));
    assert!(!GatewayError::Timeout { seconds: 30 }.is_transient(&codes));
}

#[test]
fn test_error_code_follows_configured_allow_list() {
    let too_many = GatewayError::Database {
        code: 1040,
        message: "Too many connections".into(),
    };
    assert_eq!(too_many.error_code(), error_code::DB_ERROR);
    assert_eq!(too_many.error_code_for(&[1040]), error_code::TRANSIENT_DB_ERROR);

    let deadlock = GatewayError::Database {
        code: 1213,
        message: "Deadlock found".into(),
    };
    assert_eq!(deadlock.error_code(), error_code::TRANSIENT_DB_ERROR);
    assert_eq!(deadlock.error_code_for(&[1040]), error_code::DB_ERROR);
}

#[test]
fn test_tagged_string_format() {
    let err = CorrectionError::NotImplemented { actions: 3 };
    let tagged = err.tagged();
    assert!(tagged.starts_with("[CORRECTION_NOT_IMPLEMENTED] "));
    assert!(tagged.contains("3 correction actions"));
}

#[test]
fn test_pipeline_error_delegates_codes() {
    let err: PipelineError = ConfigError::FileNotFound {
        path: "sproc.toml".into(),
    }
    .into();
    assert_eq!(err.error_code(), error_code::CONFIG_ERROR);
    assert_eq!(PipelineError::Cancelled.error_code(), error_code::CANCELLED);
}

#[test]
fn test_pipeline_result_collects_non_fatal_errors() {
    let mut result = PipelineResult::new(vec![1, 2]);
    assert!(result.is_clean());
    result.add_error(ExtractionError::ReadFailed {
        path: "a.sql".into(),
        message: "denied".into(),
    });

    let mut inner = PipelineResult::new(7);
    inner.add_error(ExtractionError::MalformedCall {
        file: "b.cs".into(),
        line: 3,
        message: "unbalanced".into(),
    });
    let value = result.absorb(inner);

    assert_eq!(value, 7);
    assert_eq!(result.error_count(), 2);
    assert_eq!(result.data, vec![1, 2]);
}
