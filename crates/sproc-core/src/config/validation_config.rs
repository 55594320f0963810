//! Cross-validation configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_GATEWAY_RECEIVERS: &[&str] = &["Helper_Database_StoredProcedure"];

pub const DEFAULT_GATEWAY_METHODS: &[&str] = &[
    "ExecuteDataTableWithStatus",
    "ExecuteWithStatus",
    "ExecuteNonQueryWithStatus",
    "ExecuteScalarWithStatus",
    "ExecuteDataTable",
    "ExecuteNonQuery",
    "ExecuteScalar",
];

/// Configuration for call-site extraction and validation rules.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValidationConfig {
    /// Parameter-name prefix tolerated on either side. Default: "p_".
    pub parameter_prefix: Option<String>,
    /// Match `PartID` against `p_PartID`. Default: true.
    pub normalize_prefix: Option<bool>,
    /// Require `p_Status`/`p_ErrorMsg` OUT parameters. Default: true.
    pub require_standard_outputs: Option<bool>,
    /// Receivers whose methods are gateway calls. Empty matches any receiver.
    #[serde(default)]
    pub gateway_receivers: Vec<String>,
    /// Gateway method names.
    #[serde(default)]
    pub gateway_methods: Vec<String>,
}

impl ValidationConfig {
    pub fn effective_parameter_prefix(&self) -> &str {
        self.parameter_prefix.as_deref().unwrap_or("p_")
    }

    pub fn effective_normalize_prefix(&self) -> bool {
        self.normalize_prefix.unwrap_or(true)
    }

    pub fn effective_require_standard_outputs(&self) -> bool {
        self.require_standard_outputs.unwrap_or(true)
    }

    pub fn effective_gateway_receivers(&self) -> Vec<String> {
        if self.gateway_receivers.is_empty() {
            DEFAULT_GATEWAY_RECEIVERS.iter().map(|s| s.to_string()).collect()
        } else {
            self.gateway_receivers.clone()
        }
    }

    pub fn effective_gateway_methods(&self) -> Vec<String> {
        if self.gateway_methods.is_empty() {
            DEFAULT_GATEWAY_METHODS.iter().map(|s| s.to_string()).collect()
        } else {
            self.gateway_methods.clone()
        }
    }
}
