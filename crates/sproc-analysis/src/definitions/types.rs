//! Procedure definition types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction keyword of a formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterDirection {
    In,
    Out,
    InOut,
}

impl ParameterDirection {
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "IN" => Some(Self::In),
            "OUT" => Some(Self::Out),
            "INOUT" => Some(Self::InOut),
            _ => None,
        }
    }

    /// IN and INOUT parameters must be supplied by the caller.
    pub fn is_input(self) -> bool {
        matches!(self, Self::In | Self::InOut)
    }

    /// OUT and INOUT parameters return a value to the caller.
    pub fn is_output(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::InOut => "INOUT",
        }
    }
}

impl fmt::Display for ParameterDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One formal parameter of a stored procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub direction: ParameterDirection,
}

impl ProcedureParameter {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>, direction: ParameterDirection) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            direction,
        }
    }
}

/// A stored procedure found in SQL source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureDefinition {
    pub name: String,
    pub parameters: Vec<ProcedureParameter>,
    pub source_file: String,
}

impl ProcedureDefinition {
    /// Parameter by exact name, ignoring ASCII case.
    pub fn parameter(&self, name: &str) -> Option<&ProcedureParameter> {
        self.parameters.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// IN and INOUT parameters in declaration order.
    pub fn input_parameters(&self) -> impl Iterator<Item = &ProcedureParameter> {
        self.parameters.iter().filter(|p| p.direction.is_input())
    }

    /// Whether a parameter with this name is declared with direction `OUT`.
    /// An `INOUT` parameter does not count.
    pub fn declares_output(&self, name: &str) -> bool {
        self.parameter(name)
            .is_some_and(|p| p.direction == ParameterDirection::Out)
    }
}
