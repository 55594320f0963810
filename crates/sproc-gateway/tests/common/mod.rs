//! Scripted in-memory backend shared by the gateway tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sproc_core::diagnostics::MemoryErrorSink;
use sproc_core::errors::GatewayError;
use sproc_gateway::{
    BackendConnection, CallMode, CallOutput, CallRequest, Gateway, GatewaySettings, ParamValue,
    ProcedureBackend, RetryPolicy, Row,
};
use tokio::time::Instant;

/// What the next `call` does.
pub enum Step {
    Return(CallOutput),
    Fail(GatewayError),
    Hang,
}

#[derive(Default)]
pub struct FakeState {
    script: Mutex<VecDeque<Step>>,
    connects: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
    calls: Mutex<Vec<(String, CallMode, Vec<String>)>>,
    events: Mutex<Vec<String>>,
    hang_on_commit: AtomicBool,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    pub state: Arc<FakeState>,
}

impl FakeBackend {
    pub fn scripted(steps: impl IntoIterator<Item = Step>) -> Self {
        let backend = Self::default();
        backend.state.script.lock().unwrap().extend(steps);
        backend
    }

    /// `commit` never completes.
    pub fn hanging_commit(self) -> Self {
        self.state.hang_on_commit.store(true, Ordering::SeqCst);
        self
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.state.call_times.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<(String, CallMode, Vec<String>)> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().unwrap().clone()
    }
}

pub struct FakeConnection {
    state: Arc<FakeState>,
}

impl FakeConnection {
    fn event(&self, name: &str) {
        self.state.events.lock().unwrap().push(name.to_string());
    }
}

impl ProcedureBackend for FakeBackend {
    type Connection = FakeConnection;

    async fn connect(&self) -> Result<FakeConnection, GatewayError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state.events.lock().unwrap().push("connect".to_string());
        Ok(FakeConnection {
            state: Arc::clone(&self.state),
        })
    }
}

impl BackendConnection for FakeConnection {
    async fn call(&mut self, request: &CallRequest<'_>) -> Result<CallOutput, GatewayError> {
        self.state.call_times.lock().unwrap().push(Instant::now());
        self.state.calls.lock().unwrap().push((
            request.procedure.to_string(),
            request.mode,
            request.params.names().iter().map(|s| s.to_string()).collect(),
        ));
        self.event(&format!("call:{}", request.procedure));
        let step = self.state.script.lock().unwrap().pop_front();
        match step {
            None => Ok(CallOutput::default()),
            Some(Step::Return(output)) => Ok(output),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn ping(&mut self) -> Result<(), GatewayError> {
        self.event("ping");
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), GatewayError> {
        self.event("begin");
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), GatewayError> {
        self.event("commit");
        if self.state.hang_on_commit.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), GatewayError> {
        self.event("rollback");
        Ok(())
    }

    async fn close(self) -> Result<(), GatewayError> {
        self.event("close");
        Ok(())
    }
}

pub fn settings() -> GatewaySettings {
    GatewaySettings {
        command_timeout: Duration::from_secs(30),
        retry: RetryPolicy::default(),
        status_parameter: "p_Status".to_string(),
        error_message_parameter: "p_ErrorMsg".to_string(),
    }
}

pub fn gateway(backend: &FakeBackend) -> (Gateway<FakeBackend>, Arc<MemoryErrorSink>) {
    let sink = Arc::new(MemoryErrorSink::new());
    let gateway = Gateway::new(backend.clone(), settings(), sink.clone());
    (gateway, sink)
}

pub fn db_error(code: u16) -> GatewayError {
    GatewayError::Database {
        code,
        message: format!("server error {code}"),
    }
}

pub fn rows(rows: Vec<Row>) -> CallOutput {
    CallOutput {
        rows,
        ..CallOutput::default()
    }
}

pub fn status_output(status: i64, message: Option<&str>, rows: Vec<Row>) -> CallOutput {
    CallOutput {
        rows,
        rows_affected: 0,
        outputs: BTreeMap::from([
            ("p_Status".to_string(), ParamValue::Int(status)),
            (
                "p_ErrorMsg".to_string(),
                message.map_or(ParamValue::Null, ParamValue::from),
            ),
        ]),
    }
}

pub fn inventory_row(part: &str, quantity: i64) -> Row {
    Row::from_pairs([
        ("PartID", ParamValue::from(part)),
        ("Quantity", ParamValue::from(quantity)),
    ])
}
