//! Correction generator configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Only preview actions. Default: true.
    pub dry_run: Option<bool>,
    /// Number of actions shown in a dry-run preview. Default: 10.
    pub preview_limit: Option<usize>,
    /// Number of MEDIUM recommendations listed. Default: 3.
    pub medium_recommendation_limit: Option<usize>,
}

impl CorrectionConfig {
    pub fn effective_dry_run(&self) -> bool {
        self.dry_run.unwrap_or(true)
    }

    pub fn effective_preview_limit(&self) -> usize {
        self.preview_limit.unwrap_or(10)
    }

    pub fn effective_medium_recommendation_limit(&self) -> usize {
        self.medium_recommendation_limit.unwrap_or(3)
    }
}
