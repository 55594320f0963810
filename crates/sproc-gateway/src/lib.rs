//! sproc-gateway: the single chokepoint for database access.
//!
//! Callers name a stored procedure and supply parameters; the gateway
//! rejects anything that looks like inline SQL, opens one connection per
//! call, retries allow-listed transient failures with exponential backoff,
//! and always answers with a [`ProcedureResult`]. Driver errors never
//! escape: they are reported to the configured
//! [`ErrorSink`](sproc_core::ErrorSink) and folded into a failed result.

pub mod backend;
pub mod gateway;
pub mod mysql;
pub mod policy;
pub mod result;
pub mod retry;
pub mod row;
pub mod transaction;
pub mod value;

pub use backend::{BackendConnection, CallMode, CallOutput, CallRequest, ProcedureBackend};
pub use gateway::{CallBuilder, Gateway, GatewaySettings};
pub use mysql::MySqlBackend;
pub use policy::{check_procedure_name, SQL_KEYWORDS};
pub use result::{OutputParameter, ProcedureResult, StatusOutputs};
pub use retry::RetryPolicy;
pub use row::{FromRow, Row};
pub use transaction::TransactionScope;
pub use value::{FromValue, ParamValue, ProcedureParams};
