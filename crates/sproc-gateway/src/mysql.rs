//! MySQL backend on sqlx.
//!
//! Procedures are invoked by name the way a stored-procedure command
//! would: the declared parameter order is read from
//! `information_schema.PARAMETERS`, supplied values are bound to IN and
//! INOUT slots by name, OUT slots are routed through session variables
//! and read back with a follow-up `SELECT`.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sproc_core::config::DatabaseConfig;
use sproc_core::errors::GatewayError;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Connection, Executor, Row as _, TypeInfo, ValueRef};

use crate::backend::{BackendConnection, CallMode, CallOutput, CallRequest, ProcedureBackend};
use crate::row::Row;
use crate::value::{ParamValue, ProcedureParams};

/// "Lost connection to MySQL server during query".
const CR_SERVER_LOST: u16 = 2013;

const SIGNATURE_SQL: &str = "SELECT CAST(PARAMETER_NAME AS CHAR) AS name, CAST(PARAMETER_MODE AS CHAR) AS mode \
     FROM information_schema.PARAMETERS \
     WHERE SPECIFIC_SCHEMA = COALESCE(?, DATABASE()) AND SPECIFIC_NAME = ? \
       AND ROUTINE_TYPE = 'PROCEDURE' AND ORDINAL_POSITION > 0 \
     ORDER BY ORDINAL_POSITION";

/// Production backend: one `MySqlConnection` per gateway call.
#[derive(Debug, Clone)]
pub struct MySqlBackend {
    options: MySqlConnectOptions,
}

impl MySqlBackend {
    pub fn new(connection_string: &str) -> Result<Self, GatewayError> {
        let options =
            MySqlConnectOptions::from_str(connection_string).map_err(|e| GatewayError::Connection {
                code: None,
                message: format!("invalid connection string: {e}"),
            })?;
        Ok(Self { options })
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self, GatewayError> {
        let connection_string =
            config
                .connection_string
                .as_deref()
                .ok_or_else(|| GatewayError::Connection {
                    code: None,
                    message: "no connection string configured".to_string(),
                })?;
        Self::new(connection_string)
    }
}

impl ProcedureBackend for MySqlBackend {
    type Connection = MySqlProcedureConnection;

    async fn connect(&self) -> Result<Self::Connection, GatewayError> {
        let conn = self
            .options
            .connect()
            .await
            .map_err(|e| map_sqlx_error(e, true))?;
        Ok(MySqlProcedureConnection { conn })
    }
}

/// An open MySQL connection.
pub struct MySqlProcedureConnection {
    conn: MySqlConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    In,
    Out,
    InOut,
}

impl MySqlProcedureConnection {
    /// Declared parameters of `procedure`, in call order.
    async fn signature(&mut self, procedure: &str) -> Result<Vec<(String, Mode)>, GatewayError> {
        let (schema, name) = split_qualified(procedure);
        let rows = sqlx::query(SIGNATURE_SQL)
            .bind(schema)
            .bind(name)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| map_sqlx_error(e, false))?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get_unchecked("name").map_err(decode_error)?;
                let mode: Option<String> = row.try_get_unchecked("mode").map_err(decode_error)?;
                let mode = match mode.as_deref().map(str::to_ascii_uppercase).as_deref() {
                    Some("OUT") => Mode::Out,
                    Some("INOUT") => Mode::InOut,
                    _ => Mode::In,
                };
                Ok((name, mode))
            })
            .collect()
    }
}

impl BackendConnection for MySqlProcedureConnection {
    async fn call(&mut self, request: &CallRequest<'_>) -> Result<CallOutput, GatewayError> {
        let signature = self.signature(request.procedure).await?;
        let plan = CallPlan::build(request.procedure, &signature, request.params)?;

        for (var, value) in &plan.presets {
            let set = format!("SET {var} = ?");
            bind_value(sqlx::query(&set), value)
                .execute(&mut self.conn)
                .await
                .map_err(|e| map_sqlx_error(e, false))?;
        }

        let mut query = sqlx::query(&plan.call_sql);
        for value in &plan.binds {
            query = bind_value(query, value);
        }

        let mut output = CallOutput::default();
        match request.mode {
            CallMode::Rows => {
                let rows = query
                    .fetch_all(&mut self.conn)
                    .await
                    .map_err(|e| map_sqlx_error(e, false))?;
                output.rows = rows.iter().map(decode_row).collect::<Result<_, _>>()?;
            }
            CallMode::NonQuery => {
                let done = query
                    .execute(&mut self.conn)
                    .await
                    .map_err(|e| map_sqlx_error(e, false))?;
                output.rows_affected = done.rows_affected();
            }
        }

        if !plan.out_vars.is_empty() {
            let select = plan
                .out_vars
                .iter()
                .map(|(name, var)| format!("{var} AS `{name}`"))
                .collect::<Vec<_>>()
                .join(", ");
            let row = sqlx::query(&format!("SELECT {select}"))
                .fetch_one(&mut self.conn)
                .await
                .map_err(|e| map_sqlx_error(e, false))?;
            let decoded = decode_row(&row)?;
            output.outputs = decoded
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect::<BTreeMap<_, _>>();
        }

        Ok(output)
    }

    async fn ping(&mut self) -> Result<(), GatewayError> {
        self.conn.ping().await.map_err(|e| map_sqlx_error(e, false))
    }

    async fn begin(&mut self) -> Result<(), GatewayError> {
        self.simple("START TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<(), GatewayError> {
        self.simple("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), GatewayError> {
        self.simple("ROLLBACK").await
    }

    async fn close(self) -> Result<(), GatewayError> {
        self.conn.close().await.map_err(|e| map_sqlx_error(e, false))
    }
}

impl MySqlProcedureConnection {
    async fn simple(&mut self, statement: &str) -> Result<(), GatewayError> {
        (&mut self.conn)
            .execute(statement)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error(e, false))
    }
}

/// The `CALL` statement and everything bound to it.
#[derive(Debug, Default, PartialEq)]
struct CallPlan {
    call_sql: String,
    binds: Vec<ParamValue>,
    presets: Vec<(String, ParamValue)>,
    out_vars: Vec<(String, String)>,
}

impl CallPlan {
    fn build(
        procedure: &str,
        signature: &[(String, Mode)],
        params: &ProcedureParams,
    ) -> Result<Self, GatewayError> {
        let mut plan = CallPlan::default();

        if signature.is_empty() {
            // Unknown routine or no declared parameters: let the server
            // decide, binding whatever was supplied in order.
            plan.binds = params.iter().map(|(_, v)| v.clone()).collect();
        } else if let Some(unknown) = params
            .names()
            .into_iter()
            .find(|key| !signature.iter().any(|(name, _)| same_parameter(key, name)))
        {
            return Err(GatewayError::Driver {
                message: format!("procedure '{procedure}' declares no parameter '{unknown}'"),
            });
        }

        let mut placeholders = Vec::with_capacity(signature.len().max(plan.binds.len()));
        if signature.is_empty() {
            placeholders.extend(plan.binds.iter().map(|_| "?".to_string()));
        }
        for (index, (name, mode)) in signature.iter().enumerate() {
            let supplied = params
                .iter()
                .find(|(key, _)| same_parameter(key, name))
                .map(|(_, v)| v.clone())
                .unwrap_or(ParamValue::Null);
            match mode {
                Mode::In => {
                    placeholders.push("?".to_string());
                    plan.binds.push(supplied);
                }
                Mode::Out | Mode::InOut => {
                    let var = format!("@sproc_out_{index}");
                    if *mode == Mode::InOut {
                        plan.presets.push((var.clone(), supplied));
                    }
                    placeholders.push(var.clone());
                    plan.out_vars.push((name.clone(), var));
                }
            }
        }

        plan.call_sql = format!("CALL {}({})", quote_qualified(procedure), placeholders.join(", "));
        Ok(plan)
    }
}

/// Names match ignoring case, a leading `@`, and a `p_` prefix.
fn same_parameter(supplied: &str, declared: &str) -> bool {
    fn bare(name: &str) -> String {
        let name = name.trim().trim_start_matches('@').to_ascii_lowercase();
        match name.strip_prefix("p_") {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => name,
        }
    }
    bare(supplied) == bare(declared)
}

fn split_qualified(procedure: &str) -> (Option<String>, String) {
    let unquoted = procedure.replace('`', "");
    match unquoted.split_once('.') {
        Some((schema, name)) => (Some(schema.to_string()), name.to_string()),
        None => (None, unquoted),
    }
}

fn quote_qualified(procedure: &str) -> String {
    procedure
        .replace('`', "")
        .split('.')
        .map(|part| format!("`{part}`"))
        .collect::<Vec<_>>()
        .join(".")
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &ParamValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        ParamValue::Null => query.bind(None::<String>),
        ParamValue::Bool(v) => query.bind(*v),
        ParamValue::Int(v) => query.bind(*v),
        ParamValue::UInt(v) => query.bind(*v),
        ParamValue::Float(v) => query.bind(*v),
        ParamValue::Text(v) => query.bind(v.clone()),
        ParamValue::Bytes(v) => query.bind(v.clone()),
        ParamValue::DateTime(v) => query.bind(*v),
    }
}

fn decode_row(row: &MySqlRow) -> Result<Row, GatewayError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(decode_column(row, index)?);
    }
    Ok(Row::new(columns, values))
}

fn decode_column(row: &MySqlRow, index: usize) -> Result<ParamValue, GatewayError> {
    let raw = row.try_get_raw(index).map_err(decode_error)?;
    if raw.is_null() {
        return Ok(ParamValue::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "BOOLEAN" => ParamValue::Bool(row.try_get_unchecked(index).map_err(decode_error)?),
        t if t.ends_with("UNSIGNED") => {
            ParamValue::UInt(row.try_get_unchecked(index).map_err(decode_error)?)
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            ParamValue::Int(row.try_get_unchecked(index).map_err(decode_error)?)
        }
        "FLOAT" => {
            let v: f32 = row.try_get_unchecked(index).map_err(decode_error)?;
            ParamValue::Float(f64::from(v))
        }
        "DOUBLE" => ParamValue::Float(row.try_get_unchecked(index).map_err(decode_error)?),
        "DATETIME" | "TIMESTAMP" => {
            ParamValue::DateTime(row.try_get_unchecked::<NaiveDateTime, _>(index).map_err(decode_error)?)
        }
        "DATE" => {
            let date: NaiveDate = row.try_get_unchecked(index).map_err(decode_error)?;
            ParamValue::DateTime(date.and_time(NaiveTime::MIN))
        }
        "TIME" => {
            let time: NaiveTime = row.try_get_unchecked(index).map_err(decode_error)?;
            ParamValue::Text(time.to_string())
        }
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            ParamValue::Bytes(row.try_get_unchecked(index).map_err(decode_error)?)
        }
        _ => ParamValue::Text(row.try_get_unchecked(index).map_err(decode_error)?),
    };
    Ok(value)
}

fn decode_error(err: sqlx::Error) -> GatewayError {
    GatewayError::Decode {
        target: "column".to_string(),
        message: err.to_string(),
    }
}

/// Translate a driver error, keeping the server error number when there
/// is one so the retry policy can classify it.
fn map_sqlx_error(err: sqlx::Error, connecting: bool) -> GatewayError {
    match err {
        sqlx::Error::Database(db) => {
            let code = db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number);
            let message = db.to_string();
            match (connecting, code) {
                (true, code) => GatewayError::Connection { code, message },
                (false, Some(code)) => GatewayError::Database { code, message },
                (false, None) => GatewayError::Driver { message },
            }
        }
        sqlx::Error::Io(e) if connecting => GatewayError::Connection {
            code: None,
            message: e.to_string(),
        },
        sqlx::Error::Io(e) => GatewayError::Database {
            code: CR_SERVER_LOST,
            message: e.to_string(),
        },
        sqlx::Error::Tls(e) => GatewayError::Connection {
            code: None,
            message: e.to_string(),
        },
        sqlx::Error::Configuration(e) => GatewayError::Connection {
            code: None,
            message: e.to_string(),
        },
        other => GatewayError::Driver {
            message: other.to_string(),
        },
    }
}
