//! Parameter-name normalization.

use sproc_core::config::ValidationConfig;

/// Compares parameter names the way callers and procedures actually
/// disagree about them: ASCII case, a leading `@`, and the conventional
/// prefix (`PartID` against `p_PartID`).
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    prefix: Option<String>,
}

impl NameNormalizer {
    /// Tolerate `prefix` being present on one side only.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: Some(prefix.to_lowercase()).filter(|p| !p.is_empty()),
        }
    }

    /// Case and `@` only.
    pub fn exact() -> Self {
        Self { prefix: None }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        if config.effective_normalize_prefix() {
            Self::with_prefix(config.effective_parameter_prefix())
        } else {
            Self::exact()
        }
    }

    pub fn normalize(&self, name: &str) -> String {
        let name = name.trim().trim_start_matches('@').to_lowercase();
        match &self.prefix {
            Some(prefix) if name.len() > prefix.len() && name.starts_with(prefix.as_str()) => {
                name[prefix.len()..].to_string()
            }
            _ => name,
        }
    }

    pub fn same(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::with_prefix("p_")
    }
}
