//! Backend seam between the gateway and a concrete database driver.

use std::collections::BTreeMap;

use sproc_core::errors::GatewayError;

use crate::result::OutputParameter;
use crate::row::Row;
use crate::value::{ParamValue, ProcedureParams};

/// Whether the call returns rows or an affected-row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Rows,
    NonQuery,
}

/// Everything a backend needs to invoke one procedure.
#[derive(Debug, Clone, Copy)]
pub struct CallRequest<'a> {
    pub procedure: &'a str,
    pub params: &'a ProcedureParams,
    pub mode: CallMode,
    /// OUT parameters the caller wants resolved.
    pub outputs: &'a [OutputParameter],
}

/// Raw output of one procedure invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOutput {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    /// Every OUT/INOUT value the procedure returned, by parameter name.
    pub outputs: BTreeMap<String, ParamValue>,
}

/// Opens connections. One connection is opened per gateway call and
/// released before any retry delay.
#[allow(async_fn_in_trait)]
pub trait ProcedureBackend: Send + Sync {
    type Connection: BackendConnection;

    async fn connect(&self) -> Result<Self::Connection, GatewayError>;
}

/// A single open connection.
#[allow(async_fn_in_trait)]
pub trait BackendConnection: Send {
    async fn call(&mut self, request: &CallRequest<'_>) -> Result<CallOutput, GatewayError>;

    async fn ping(&mut self) -> Result<(), GatewayError>;

    async fn begin(&mut self) -> Result<(), GatewayError>;

    async fn commit(&mut self) -> Result<(), GatewayError>;

    async fn rollback(&mut self) -> Result<(), GatewayError>;

    /// Release the connection.
    async fn close(self) -> Result<(), GatewayError>;
}
