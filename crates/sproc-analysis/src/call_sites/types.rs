//! Call-site types.

use std::collections::BTreeMap;

use serde::Serialize;
use sproc_core::config::ValidationConfig;

/// Where the parameter map of a call came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterSource {
    /// A dictionary initializer written inside the call.
    Inline,
    /// A local variable resolved from its declaration before the call.
    Variable(String),
    /// No parameter map was passed, or `null` was.
    None,
    /// A map was passed but could not be read statically.
    Unresolved,
}

impl ParameterSource {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// One gateway invocation found in caller source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureCall {
    pub procedure_name: String,
    /// Path relative to the project root.
    pub source_file: String,
    /// 1-based line of the call expression.
    pub line_number: usize,
    /// Gateway method invoked, e.g. `ExecuteDataTableWithStatus`.
    pub method: String,
    /// Parameter key as written in the call, mapped to its value expression
    /// text. Display only.
    pub supplied_parameters: BTreeMap<String, String>,
    pub parameter_source: ParameterSource,
}

/// Receiver and method names that identify a gateway invocation.
#[derive(Debug, Clone)]
pub struct GatewayPattern {
    /// Empty matches any receiver.
    pub receivers: Vec<String>,
    pub methods: Vec<String>,
}

impl GatewayPattern {
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            receivers: config.effective_gateway_receivers(),
            methods: config.effective_gateway_methods(),
        }
    }

    /// Whether `receiver.method(...)` is a gateway call. Only the last
    /// segment of a qualified receiver is compared.
    pub fn matches(&self, receiver: &str, method: &str) -> bool {
        let method = method.split('<').next().unwrap_or(method).trim();
        if !self.methods.iter().any(|m| m == method) {
            return false;
        }
        let receiver = receiver.rsplit('.').next().unwrap_or(receiver).trim();
        self.receivers.is_empty() || self.receivers.iter().any(|r| r == receiver)
    }
}

impl Default for GatewayPattern {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

/// An invocation located in source, before its arguments are interpreted.
#[derive(Debug, Clone)]
pub(crate) struct RawCall {
    /// Byte offset of the call expression.
    pub offset: usize,
    pub line: usize,
    pub method: String,
    /// Argument texts in order.
    pub arguments: Vec<String>,
}
