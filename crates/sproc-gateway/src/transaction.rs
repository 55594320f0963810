//! Transaction-scoped units of work.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sproc_core::errors::GatewayError;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendConnection, CallMode, CallOutput, CallRequest, ProcedureBackend};
use crate::gateway::{cancellable, release, timed, Gateway, GatewaySettings};
use crate::policy::check_procedure_name;
use crate::result::{ProcedureResult, StatusOutputs};
use crate::row::FromRow;
use crate::value::ProcedureParams;

/// The future returned by a unit of work, borrowing the scope for `'t`.
pub type UnitOfWork<'t, T> = Pin<Box<dyn Future<Output = Result<T, GatewayError>> + 't>>;

/// Procedure calls made inside one open transaction. Any error returned
/// from the unit of work rolls the whole transaction back.
pub struct TransactionScope<'c, C: BackendConnection> {
    conn: &'c mut C,
    settings: &'c GatewaySettings,
    cancel: Option<&'c CancellationToken>,
}

impl<C: BackendConnection> TransactionScope<'_, C> {
    pub async fn query<T: FromRow>(
        &mut self,
        procedure: &str,
        params: &ProcedureParams,
    ) -> Result<Vec<T>, GatewayError> {
        let output = self.invoke(procedure, params, CallMode::Rows, false).await?;
        output.rows.iter().map(T::from_row).collect()
    }

    /// A negative `p_Status` is an error, so it also rolls back.
    pub async fn query_with_status<T: FromRow>(
        &mut self,
        procedure: &str,
        params: &ProcedureParams,
    ) -> Result<(Vec<T>, StatusOutputs), GatewayError> {
        let output = self.invoke(procedure, params, CallMode::Rows, true).await?;
        let outputs = StatusOutputs::resolve(&self.settings.status_outputs(), output.outputs);
        if !outputs.is_success() {
            return Err(GatewayError::ProcedureStatus {
                status: outputs.status,
                message: outputs.error_msg,
            });
        }
        let rows = output.rows.iter().map(T::from_row).collect::<Result<_, _>>()?;
        Ok((rows, outputs))
    }

    /// Non-query; returns the affected-row count.
    pub async fn execute(&mut self, procedure: &str, params: &ProcedureParams) -> Result<u64, GatewayError> {
        let output = self.invoke(procedure, params, CallMode::NonQuery, false).await?;
        Ok(output.rows_affected)
    }

    async fn invoke(
        &mut self,
        procedure: &str,
        params: &ProcedureParams,
        mode: CallMode,
        with_status: bool,
    ) -> Result<CallOutput, GatewayError> {
        check_procedure_name(procedure)?;
        let descriptors = if with_status {
            self.settings.status_outputs()
        } else {
            Vec::new()
        };
        let request = CallRequest {
            procedure: procedure.trim(),
            params,
            mode,
            outputs: &descriptors,
        };
        let timeout = self.settings.command_timeout;
        cancellable(self.cancel, timed(timeout, self.conn.call(&request))).await
    }
}

impl<B: ProcedureBackend> Gateway<B> {
    /// Run `work` inside a transaction on a single connection: commit when
    /// it returns `Ok`, roll back when it returns `Err`, and report the
    /// failure as `Transaction failed: ...`.
    ///
    /// ```ignore
    /// let moved = gateway
    ///     .transaction("transfer", |tx| {
    ///         Box::pin(async move {
    ///             tx.execute("inv_inventory_Remove_Item", &remove).await?;
    ///             tx.execute("inv_inventory_Add_Item", &add).await
    ///         })
    ///     })
    ///     .await;
    /// ```
    pub async fn transaction<T, F>(&self, operation: &str, work: F) -> ProcedureResult<T>
    where
        F: for<'t> FnOnce(&'t mut TransactionScope<'_, B::Connection>) -> UnitOfWork<'t, T>,
    {
        self.run_transaction(operation, None, work).await
    }

    /// [`Gateway::transaction`] that gives up when `token` is cancelled.
    /// An open transaction is rolled back before the connection is released.
    pub async fn transaction_cancellable<T, F>(
        &self,
        operation: &str,
        token: &CancellationToken,
        work: F,
    ) -> ProcedureResult<T>
    where
        F: for<'t> FnOnce(&'t mut TransactionScope<'_, B::Connection>) -> UnitOfWork<'t, T>,
    {
        self.run_transaction(operation, Some(token), work).await
    }

    async fn run_transaction<T, F>(
        &self,
        operation: &str,
        cancel: Option<&CancellationToken>,
        work: F,
    ) -> ProcedureResult<T>
    where
        F: for<'t> FnOnce(&'t mut TransactionScope<'_, B::Connection>) -> UnitOfWork<'t, T>,
    {
        let timeout = self.settings.command_timeout;
        let outcome = async {
            let mut conn = cancellable(cancel, self.backend.connect()).await?;
            if let Err(e) = cancellable(cancel, timed(timeout, conn.begin())).await {
                release(conn).await;
                return Err(stage_error("begin", e));
            }

            let result = {
                let mut scope = TransactionScope {
                    conn: &mut conn,
                    settings: &self.settings,
                    cancel,
                };
                work(&mut scope).await
            };

            let result = match result {
                Ok(value) => match cancellable(cancel, timed(timeout, conn.commit())).await {
                    Ok(()) => Ok(value),
                    Err(e) => {
                        roll_back(&mut conn, operation, timeout).await;
                        Err(stage_error("commit", e))
                    }
                },
                Err(e) => {
                    tracing::debug!(operation, error = %e, "rolling back transaction");
                    roll_back(&mut conn, operation, timeout).await;
                    Err(e)
                }
            };
            release(conn).await;
            result
        }
        .await;

        match outcome {
            Ok(value) => ProcedureResult::success_with(value),
            Err(err) => {
                let mut failed: ProcedureResult<T> = self.fail(operation, None, err, 1);
                failed.message = format!("Transaction failed: {}", failed.message);
                failed
            }
        }
    }
}

/// Rollback is never cancelled, only bounded by the timeout.
async fn roll_back<C: BackendConnection>(conn: &mut C, operation: &str, timeout: Duration) {
    if let Err(e) = timed(timeout, conn.rollback()).await {
        tracing::warn!(operation, error = %e, "rollback failed");
    }
}

/// Cancellation and timeouts keep their own error codes.
fn stage_error(stage: &'static str, err: GatewayError) -> GatewayError {
    match err {
        GatewayError::Cancelled | GatewayError::Timeout { .. } => err,
        other => GatewayError::Transaction {
            stage,
            message: other.to_string(),
        },
    }
}
