//! The procedure call gateway.
//!
//! `Idle -> Executing -> {Success, RetryableFailure -> Executing, TerminalFailure}`:
//! the name is checked first, then each attempt opens a connection,
//! runs the command under the command timeout and releases the connection
//! before any backoff sleep. Only the row-set query variants retry.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sproc_core::config::DatabaseConfig;
use sproc_core::diagnostics::{ErrorReport, ErrorSink, TracingErrorSink};
use sproc_core::errors::GatewayError;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendConnection, CallMode, CallOutput, CallRequest, ProcedureBackend};
use crate::policy::check_procedure_name;
use crate::result::{OutputParameter, ProcedureResult, StatusOutputs};
use crate::retry::RetryPolicy;
use crate::row::FromRow;
use crate::value::{FromValue, ParamValue, ProcedureParams};

/// Gateway tuning, normally built from `[database]` configuration.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub command_timeout: Duration,
    pub retry: RetryPolicy,
    pub status_parameter: String,
    pub error_message_parameter: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

impl GatewaySettings {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            command_timeout: config.effective_command_timeout(),
            retry: RetryPolicy::from_config(config),
            status_parameter: config.effective_status_parameter().to_string(),
            error_message_parameter: config.effective_error_message_parameter().to_string(),
        }
    }

    /// Descriptors for the standard `p_Status`/`p_ErrorMsg` OUT parameters.
    pub fn status_outputs(&self) -> Vec<OutputParameter> {
        vec![
            OutputParameter::int(&self.status_parameter),
            OutputParameter::text(&self.error_message_parameter),
        ]
    }
}

/// Single chokepoint for stored procedure calls.
///
/// The gateway holds no per-call state; concurrent callers share it freely.
pub struct Gateway<B: ProcedureBackend> {
    pub(crate) backend: B,
    pub(crate) settings: GatewaySettings,
    pub(crate) sink: Arc<dyn ErrorSink>,
}

impl<B: ProcedureBackend> Gateway<B> {
    pub fn new(backend: B, settings: GatewaySettings, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            backend,
            settings,
            sink,
        }
    }

    /// Gateway that reports failures through `tracing` only.
    pub fn with_tracing_sink(backend: B, settings: GatewaySettings) -> Self {
        Self::new(backend, settings, Arc::new(TracingErrorSink::default()))
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Start building a call to `procedure`.
    pub fn call(&self, procedure: impl Into<String>) -> CallBuilder<'_, B> {
        CallBuilder {
            gateway: self,
            procedure: procedure.into(),
            params: ProcedureParams::new(),
            user_id: None,
            cancel: None,
        }
    }

    /// Row-set query.
    pub async fn query<T: FromRow>(&self, procedure: &str, params: ProcedureParams) -> ProcedureResult<T> {
        self.call(procedure).params(params).query().await
    }

    /// Row-set query whose status and message come from `p_Status`/`p_ErrorMsg`.
    pub async fn query_with_status<T: FromRow>(
        &self,
        procedure: &str,
        params: ProcedureParams,
    ) -> ProcedureResult<T> {
        self.call(procedure).params(params).query_with_status().await
    }

    /// First column of the first row.
    pub async fn scalar<V: FromValue>(&self, procedure: &str, params: ProcedureParams) -> ProcedureResult<V> {
        self.call(procedure).params(params).scalar().await
    }

    /// Non-query; the value is the affected-row count.
    pub async fn execute(&self, procedure: &str, params: ProcedureParams) -> ProcedureResult<u64> {
        self.call(procedure).params(params).execute().await
    }

    /// Open a connection and round-trip a ping.
    pub async fn ping(&self) -> ProcedureResult<()> {
        let timeout = self.settings.command_timeout;
        let outcome = async {
            let mut conn = self.backend.connect().await?;
            let result = tokio::time::timeout(timeout, conn.ping())
                .await
                .map_err(|_| GatewayError::Timeout {
                    seconds: timeout.as_secs(),
                })
                .and_then(|r| r);
            release(conn).await;
            result
        }
        .await;

        match outcome {
            Ok(()) => ProcedureResult::success(),
            Err(err) => self.fail("ping", None, err, 1),
        }
    }

    /// Report `err` to the sink and turn it into a failed result.
    pub(crate) fn fail<T>(
        &self,
        operation: &str,
        user_id: Option<&str>,
        err: GatewayError,
        attempts: u32,
    ) -> ProcedureResult<T> {
        let code = err.error_code_for(&self.settings.retry.transient_codes);
        let report = ErrorReport::new(&err, code, operation)
            .user(user_id)
            .context("attempts", attempts);
        let report = match err.server_code() {
            Some(code) => report.context("server_code", code),
            None => report,
        };
        self.sink.report(&report);
        ProcedureResult::failure(err.to_string())
    }
}

pub(crate) async fn release<C: BackendConnection>(conn: C) {
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "error while releasing connection");
    }
}

/// Fluent builder for one gateway call.
pub struct CallBuilder<'g, B: ProcedureBackend> {
    gateway: &'g Gateway<B>,
    procedure: String,
    params: ProcedureParams,
    user_id: Option<String>,
    cancel: Option<CancellationToken>,
}

impl<'g, B: ProcedureBackend> CallBuilder<'g, B> {
    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn params(mut self, params: ProcedureParams) -> Self {
        for (name, value) in params.iter() {
            self.params.insert(name, value.clone());
        }
        self
    }

    /// User on whose behalf the call runs; forwarded to the error sink.
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Abort the connection open, the command, and any backoff sleep
    /// when `token` is cancelled.
    pub fn cancel_on(mut self, token: &CancellationToken) -> Self {
        self.cancel = Some(token.clone());
        self
    }

    pub async fn query<T: FromRow>(self) -> ProcedureResult<T> {
        match self.run(CallMode::Rows, &[], true).await {
            Ok((output, attempts)) => match decode_rows(&output) {
                Ok(rows) => ProcedureResult::success_rows(rows),
                Err(err) => self.fail(err, attempts),
            },
            Err((err, attempts)) => self.fail(err, attempts),
        }
    }

    pub async fn query_with_status<T: FromRow>(self) -> ProcedureResult<T> {
        let descriptors = self.gateway.settings.status_outputs();
        let (output, attempts) = match self.run(CallMode::Rows, &descriptors, true).await {
            Ok(ok) => ok,
            Err((err, attempts)) => return self.fail(err, attempts),
        };
        let outputs = StatusOutputs::resolve(&descriptors, output.outputs.clone());
        if !outputs.is_success() {
            let err = GatewayError::ProcedureStatus {
                status: outputs.status,
                message: outputs.error_msg.clone(),
            };
            return self.fail::<T>(err, attempts).with_status(outputs);
        }
        match decode_rows(&output) {
            Ok(rows) => ProcedureResult::success_rows(rows).with_status(outputs),
            Err(err) => self.fail(err, attempts),
        }
    }

    pub async fn scalar<V: FromValue>(self) -> ProcedureResult<V> {
        let (output, attempts) = match self.run(CallMode::Rows, &[], false).await {
            Ok(ok) => ok,
            Err((err, attempts)) => return self.fail(err, attempts),
        };
        let first = output.rows.first().and_then(|row| row.value_at(0));
        match first {
            None => ProcedureResult::success(),
            Some(value) => match V::from_value(value) {
                Ok(v) => ProcedureResult::success_with(v),
                Err(err) => self.fail(err, attempts),
            },
        }
    }

    pub async fn execute(self) -> ProcedureResult<u64> {
        match self.run(CallMode::NonQuery, &[], false).await {
            Ok((output, _)) => ProcedureResult::success_with(output.rows_affected)
                .with_rows_affected(output.rows_affected),
            Err((err, attempts)) => self.fail(err, attempts),
        }
    }

    fn fail<T>(&self, err: GatewayError, attempts: u32) -> ProcedureResult<T> {
        self.gateway
            .fail(&self.procedure, self.user_id.as_deref(), err, attempts)
    }

    /// Execute with the retry state machine. Returns the output and the
    /// number of attempts made, or the terminal error and attempt count.
    async fn run(
        &self,
        mode: CallMode,
        outputs: &[OutputParameter],
        retryable: bool,
    ) -> Result<(CallOutput, u32), (GatewayError, u32)> {
        check_procedure_name(&self.procedure).map_err(|e| (e, 0))?;

        let policy = &self.gateway.settings.retry;
        let request = CallRequest {
            procedure: self.procedure.trim(),
            params: &self.params,
            mode,
            outputs,
        };

        let mut attempt = 1;
        loop {
            let started = Instant::now();
            match self.attempt(&request).await {
                Ok(output) => {
                    tracing::debug!(
                        procedure = request.procedure,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        rows = output.rows.len(),
                        "stored procedure completed"
                    );
                    return Ok((output, attempt));
                }
                Err(err) if retryable && policy.should_retry(&err, attempt) => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        procedure = request.procedure,
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient database error, retrying"
                    );
                    self.guard(async {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    })
                    .await
                    .map_err(|e| (e, attempt))?;
                    attempt += 1;
                }
                Err(err) => {
                    let err = if attempt > 1 && err.is_transient(&policy.transient_codes) {
                        GatewayError::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        }
                    } else {
                        err
                    };
                    return Err((err, attempt));
                }
            }
        }
    }

    /// One attempt on a fresh connection, released on every exit path.
    async fn attempt(&self, request: &CallRequest<'_>) -> Result<CallOutput, GatewayError> {
        let mut conn = self.guard(self.gateway.backend.connect()).await?;
        let timeout = self.gateway.settings.command_timeout;
        let result = self.guard(timed(timeout, conn.call(request))).await;
        release(conn).await;
        result
    }

    async fn guard<F, T>(&self, fut: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        cancellable(self.cancel.as_ref(), fut).await
    }
}

/// Race `fut` against `cancel`; cancellation wins ties.
pub(crate) async fn cancellable<F, T>(cancel: Option<&CancellationToken>, fut: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(GatewayError::Cancelled),
            result = fut => result,
        },
        None => fut.await,
    }
}

/// Bound `fut` by the command timeout.
pub(crate) async fn timed<F, T>(timeout: Duration, fut: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| GatewayError::Timeout {
            seconds: timeout.as_secs(),
        })?
}

fn decode_rows<T: FromRow>(output: &CallOutput) -> Result<Vec<T>, GatewayError> {
    output.rows.iter().map(T::from_row).collect()
}
