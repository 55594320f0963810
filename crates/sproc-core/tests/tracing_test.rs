//! Tests for the tracing setup.

use std::sync::Mutex;

use sproc_core::tracing::init_tracing;

/// Global mutex to serialize tracing tests (env var manipulation).
static TRACING_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn test_sproc_log_debug() {
    let _lock = TRACING_MUTEX.lock().unwrap();
    std::env::set_var("SPROC_LOG", "debug");
    init_tracing();
    std::env::remove_var("SPROC_LOG");
}

#[test]
fn test_init_tracing_idempotent() {
    let _lock = TRACING_MUTEX.lock().unwrap();
    init_tracing();
    init_tracing();
    init_tracing();
}

#[test]
fn test_invalid_sproc_log_falls_back() {
    let _lock = TRACING_MUTEX.lock().unwrap();
    std::env::set_var("SPROC_LOG", "this_is_garbage_not_a_valid_filter");
    init_tracing();
    tracing::info!("still logging after a bad filter");
    std::env::remove_var("SPROC_LOG");
}
