//! Top-level sproc configuration with 4-layer resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CorrectionConfig, DatabaseConfig, ScanConfig, ValidationConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`SPROC_*`)
/// 3. Project config (`sproc.toml` in project root)
/// 4. User config (`~/.sproc/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SprocConfig {
    pub database: DatabaseConfig,
    pub scan: ScanConfig,
    pub validation: ValidationConfig,
    pub corrections: CorrectionConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub connection_string: Option<String>,
    pub command_timeout_secs: Option<u64>,
    pub max_retry_attempts: Option<u32>,
    pub root: Option<PathBuf>,
    pub sql_paths: Vec<PathBuf>,
    pub dry_run: Option<bool>,
}

impl SprocConfig {
    /// Load configuration with 4-layer resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        // Layer 3: project config
        let project_config_path = root.join("sproc.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }
        if config.scan.root.is_none() {
            config.scan.root = Some(root.to_path_buf());
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config)?;

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration values.
    pub fn validate(config: &SprocConfig) -> Result<(), ConfigError> {
        if config.database.max_retry_attempts == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "database.max_retry_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if config.database.command_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "database.command_timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.validation.effective_normalize_prefix()
            && config.validation.effective_parameter_prefix().is_empty()
        {
            return Err(ConfigError::ValidationFailed {
                field: "validation.parameter_prefix".to_string(),
                message: "must not be empty while normalize_prefix is enabled".to_string(),
            });
        }
        if config
            .validation
            .gateway_methods
            .iter()
            .any(|m| m.trim().is_empty())
        {
            return Err(ConfigError::ValidationFailed {
                field: "validation.gateway_methods".to_string(),
                message: "method names must not be blank".to_string(),
            });
        }
        if config.scan.max_file_size == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "scan.max_file_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the user config path: `~/.sproc/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(".sproc").join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    fn merge_toml_file(config: &mut SprocConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: SprocConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins wherever it has a value.
    fn merge(base: &mut SprocConfig, other: &SprocConfig) {
        let db = &other.database;
        if db.connection_string.is_some() {
            base.database.connection_string = db.connection_string.clone();
        }
        if db.command_timeout_secs.is_some() {
            base.database.command_timeout_secs = db.command_timeout_secs;
        }
        if db.max_retry_attempts.is_some() {
            base.database.max_retry_attempts = db.max_retry_attempts;
        }
        if db.retry_backoff_base_ms.is_some() {
            base.database.retry_backoff_base_ms = db.retry_backoff_base_ms;
        }
        if !db.transient_error_codes.is_empty() {
            base.database.transient_error_codes = db.transient_error_codes.clone();
        }
        if db.status_parameter.is_some() {
            base.database.status_parameter = db.status_parameter.clone();
        }
        if db.error_message_parameter.is_some() {
            base.database.error_message_parameter = db.error_message_parameter.clone();
        }

        let scan = &other.scan;
        if scan.root.is_some() {
            base.scan.root = scan.root.clone();
        }
        if !scan.sql_paths.is_empty() {
            base.scan.sql_paths = scan.sql_paths.clone();
        }
        if !scan.source_include.is_empty() {
            base.scan.source_include = scan.source_include.clone();
        }
        if !scan.extra_ignore.is_empty() {
            base.scan.extra_ignore = scan.extra_ignore.clone();
        }
        if scan.max_file_size.is_some() {
            base.scan.max_file_size = scan.max_file_size;
        }

        let validation = &other.validation;
        if validation.parameter_prefix.is_some() {
            base.validation.parameter_prefix = validation.parameter_prefix.clone();
        }
        if validation.normalize_prefix.is_some() {
            base.validation.normalize_prefix = validation.normalize_prefix;
        }
        if validation.require_standard_outputs.is_some() {
            base.validation.require_standard_outputs = validation.require_standard_outputs;
        }
        if !validation.gateway_receivers.is_empty() {
            base.validation.gateway_receivers = validation.gateway_receivers.clone();
        }
        if !validation.gateway_methods.is_empty() {
            base.validation.gateway_methods = validation.gateway_methods.clone();
        }

        let corrections = &other.corrections;
        if corrections.dry_run.is_some() {
            base.corrections.dry_run = corrections.dry_run;
        }
        if corrections.preview_limit.is_some() {
            base.corrections.preview_limit = corrections.preview_limit;
        }
        if corrections.medium_recommendation_limit.is_some() {
            base.corrections.medium_recommendation_limit =
                corrections.medium_recommendation_limit;
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `SPROC_DATABASE_CONNECTION_STRING`, `SPROC_DATABASE_MAX_RETRY_ATTEMPTS`, etc.
    /// A set but unparseable numeric variable is an error, not a silent default.
    fn apply_env_overrides(config: &mut SprocConfig) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("SPROC_DATABASE_CONNECTION_STRING") {
            config.database.connection_string = Some(val);
        }
        if let Some(v) = env_parse::<u64>("SPROC_DATABASE_COMMAND_TIMEOUT_SECS")? {
            config.database.command_timeout_secs = Some(v);
        }
        if let Some(v) = env_parse::<u32>("SPROC_DATABASE_MAX_RETRY_ATTEMPTS")? {
            config.database.max_retry_attempts = Some(v);
        }
        if let Some(v) = env_parse::<u64>("SPROC_DATABASE_RETRY_BACKOFF_BASE_MS")? {
            config.database.retry_backoff_base_ms = Some(v);
        }
        if let Ok(val) = std::env::var("SPROC_SCAN_ROOT") {
            config.scan.root = Some(PathBuf::from(val));
        }
        if let Some(v) = env_parse::<bool>("SPROC_VALIDATION_NORMALIZE_PREFIX")? {
            config.validation.normalize_prefix = Some(v);
        }
        if let Some(v) = env_parse::<bool>("SPROC_CORRECTIONS_DRY_RUN")? {
            config.corrections.dry_run = Some(v);
        }
        Ok(())
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut SprocConfig, cli: &CliOverrides) {
        if let Some(ref v) = cli.connection_string {
            config.database.connection_string = Some(v.clone());
        }
        if let Some(v) = cli.command_timeout_secs {
            config.database.command_timeout_secs = Some(v);
        }
        if let Some(v) = cli.max_retry_attempts {
            config.database.max_retry_attempts = Some(v);
        }
        if let Some(ref v) = cli.root {
            config.scan.root = Some(v.clone());
        }
        if !cli.sql_paths.is_empty() {
            config.scan.sql_paths = cli.sql_paths.clone();
        }
        if let Some(v) = cli.dry_run {
            config.corrections.dry_run = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
