//! Transaction scope: commit on success, roll back on any error.

mod common;

use std::time::Duration;

use common::{db_error, gateway, status_output, FakeBackend, Step};
use sproc_core::errors::{error_code, GatewayError};
use sproc_gateway::{CallOutput, ProcedureParams};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_commit_when_unit_of_work_succeeds() {
    let backend = FakeBackend::scripted([
        Step::Return(CallOutput {
            rows_affected: 1,
            ..CallOutput::default()
        }),
        Step::Return(CallOutput {
            rows_affected: 1,
            ..CallOutput::default()
        }),
    ]);
    let (gateway, sink) = gateway(&backend);
    let remove = ProcedureParams::new().with("p_PartID", "21-28841-006").with("p_Location", "A1");
    let add = ProcedureParams::new().with("p_PartID", "21-28841-006").with("p_Location", "B2");

    let result = gateway
        .transaction("transfer_inventory", |tx| {
            Box::pin(async move {
                let removed = tx.execute("inv_inventory_Remove_Item", &remove).await?;
                let added = tx.execute("inv_inventory_Add_Item", &add).await?;
                Ok::<_, GatewayError>(removed + added)
            })
        })
        .await;

    assert!(result.is_success());
    assert_eq!(result.value(), Some(&2));
    assert_eq!(
        backend.events(),
        vec![
            "connect",
            "begin",
            "call:inv_inventory_Remove_Item",
            "call:inv_inventory_Add_Item",
            "commit",
            "close",
        ]
    );
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_rollback_when_a_call_fails() {
    let backend = FakeBackend::scripted([
        Step::Return(CallOutput::default()),
        Step::Fail(db_error(1452)),
    ]);
    let (gateway, sink) = gateway(&backend);

    let result = gateway
        .transaction("transfer_inventory", |tx| {
            Box::pin(async move {
                tx.execute("inv_inventory_Remove_Item", &ProcedureParams::new()).await?;
                tx.execute("inv_inventory_Add_Item", &ProcedureParams::new()).await?;
                Ok::<_, GatewayError>(())
            })
        })
        .await;

    assert!(!result.is_success());
    assert!(result.message.starts_with("Transaction failed:"), "{}", result.message);
    let events = backend.events();
    assert!(events.contains(&"rollback".to_string()));
    assert!(!events.contains(&"commit".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("close"));
    assert_eq!(sink.reports()[0].operation, "transfer_inventory");
}

#[tokio::test]
async fn test_rollback_when_unit_of_work_returns_error() {
    let backend = FakeBackend::default();
    let (gateway, _sink) = gateway(&backend);

    let result: sproc_gateway::ProcedureResult<()> = gateway
        .transaction("manual_abort", |_tx| {
            Box::pin(async move {
                Err::<(), _>(GatewayError::Driver {
                    message: "quantity would go negative".to_string(),
                })
            })
        })
        .await;

    assert!(!result.is_success());
    assert!(result.message.contains("quantity would go negative"));
    assert!(backend.events().contains(&"rollback".to_string()));
}

#[tokio::test]
async fn test_policy_violation_inside_transaction_rolls_back() {
    let backend = FakeBackend::default();
    let (gateway, sink) = gateway(&backend);

    let result = gateway
        .transaction("cleanup", |tx| {
            Box::pin(async move { tx.execute("DELETE FROM inv_inventory", &ProcedureParams::new()).await })
        })
        .await;

    assert!(!result.is_success());
    let events = backend.events();
    assert!(!events.iter().any(|e| e.starts_with("call:")));
    assert!(events.contains(&"rollback".to_string()));
    assert_eq!(sink.reports()[0].code, error_code::POLICY_VIOLATION);
}

#[tokio::test]
async fn test_negative_status_inside_transaction_rolls_back() {
    let backend = FakeBackend::scripted([Step::Return(status_output(
        -1,
        Some("Location B9 does not exist"),
        vec![],
    ))]);
    let (gateway, _sink) = gateway(&backend);

    let result = gateway
        .transaction("move", |tx| {
            Box::pin(async move {
                let (rows, _status) = tx
                    .query_with_status::<sproc_gateway::Row>("inv_inventory_Transfer_Part", &ProcedureParams::new())
                    .await?;
                Ok::<_, GatewayError>(rows.len())
            })
        })
        .await;

    assert!(!result.is_success());
    assert!(result.message.contains("Location B9 does not exist"));
    assert!(backend.events().contains(&"rollback".to_string()));
}

// ---- Cancellation and timeouts ----

#[tokio::test]
async fn test_cancelled_token_never_opens_a_connection() {
    let backend = FakeBackend::default();
    let (gateway, sink) = gateway(&backend);
    let token = CancellationToken::new();
    token.cancel();

    let result = gateway
        .transaction_cancellable("transfer_inventory", &token, |tx| {
            Box::pin(async move { tx.execute("inv_inventory_Remove_Item", &ProcedureParams::new()).await })
        })
        .await;

    assert!(!result.is_success());
    assert_eq!(backend.connects(), 0, "cancelled before connect");
    assert_eq!(sink.reports()[0].code, error_code::CANCELLED);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_unit_of_work_rolls_back() {
    let backend = FakeBackend::scripted([Step::Hang]);
    let (gateway, sink) = gateway(&backend);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let result = gateway
        .transaction_cancellable("transfer_inventory", &token, |tx| {
            Box::pin(async move { tx.execute("inv_inventory_Remove_Item", &ProcedureParams::new()).await })
        })
        .await;

    assert!(!result.is_success());
    assert_eq!(
        backend.events(),
        vec!["connect", "begin", "call:inv_inventory_Remove_Item", "rollback", "close"]
    );
    assert_eq!(sink.reports()[0].code, error_code::CANCELLED);
}

#[tokio::test(start_paused = true)]
async fn test_hung_commit_times_out_and_rolls_back() {
    let backend = FakeBackend::default().hanging_commit();
    let (gateway, sink) = gateway(&backend);

    let result = gateway
        .transaction("transfer_inventory", |tx| {
            Box::pin(async move { tx.execute("inv_inventory_Add_Item", &ProcedureParams::new()).await })
        })
        .await;

    assert!(!result.is_success());
    assert!(result.message.starts_with("Transaction failed:"), "{}", result.message);
    assert_eq!(
        backend.events(),
        vec!["connect", "begin", "call:inv_inventory_Add_Item", "commit", "rollback", "close"]
    );
    assert_eq!(sink.reports()[0].code, error_code::TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_commit_rolls_back() {
    let backend = FakeBackend::default().hanging_commit();
    let (gateway, sink) = gateway(&backend);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let result = gateway
        .transaction_cancellable("transfer_inventory", &token, |tx| {
            Box::pin(async move { tx.execute("inv_inventory_Add_Item", &ProcedureParams::new()).await })
        })
        .await;

    assert!(!result.is_success());
    let events = backend.events();
    assert!(events.contains(&"rollback".to_string()), "{events:?}");
    assert_eq!(events.last().map(String::as_str), Some("close"));
    assert_eq!(sink.reports()[0].code, error_code::CANCELLED);
}
