use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sproc_gateway::ParamValue;

#[derive(Parser)]
#[command(name = "sproc")]
#[command(about = "Stored procedure gateway and call-site validator")]
#[command(
    after_help = "Environment:\n  SPROC_LOG                          Log filter (e.g. sproc=debug)\n  SPROC_DATABASE_CONNECTION_STRING   MySQL connection string"
)]
pub struct Cli {
    /// Project root; `sproc.toml` is read from here.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,
    /// SQL file or directory with procedure definitions (repeatable).
    #[arg(long = "sql", global = true)]
    pub sql: Vec<PathBuf>,
    #[arg(long, global = true)]
    pub connection_string: Option<String>,
    #[arg(long, global = true)]
    pub command_timeout: Option<u64>,
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,
    /// Emit JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cross-validate C# call sites against SQL procedure definitions.
    Validate {
        /// Exit with status 1 when any call is invalid.
        #[arg(long, default_value_t = false)]
        fail_on_mismatch: bool,
    },
    /// Group validation findings into prioritized categories.
    Corrections,
    /// Build the standardization plan; optionally write its SQL script.
    Plan {
        /// New file to write the standardized procedures to.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Preview correction actions. `--execute` is refused.
    Apply {
        #[arg(long, default_value_t = false)]
        execute: bool,
    },
    /// Check database connectivity.
    Ping,
    /// Call a stored procedure through the gateway.
    Call {
        procedure: String,
        /// `name=value`; `null`, integers, floats and booleans are typed.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,
        /// Read p_Status / p_ErrorMsg outputs.
        #[arg(long, default_value_t = false)]
        with_status: bool,
        /// Recorded with any failure report.
        #[arg(long)]
        user: Option<String>,
    },
}

fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("parameter name missing in '{raw}'"));
    }
    Ok((name.to_string(), typed_value(value)))
}

fn typed_value(value: &str) -> ParamValue {
    if value.eq_ignore_ascii_case("null") {
        ParamValue::Null
    } else if let Ok(i) = value.parse::<i64>() {
        ParamValue::Int(i)
    } else if let Ok(f) = value.parse::<f64>() {
        ParamValue::Float(f)
    } else if let Ok(b) = value.parse::<bool>() {
        ParamValue::Bool(b)
    } else {
        ParamValue::Text(value.to_string())
    }
}
