//! Configuration system for sproc.
//! TOML-based, 4-layer resolution: CLI > env > project > user > defaults.

pub mod correction_config;
pub mod database_config;
pub mod scan_config;
pub mod sproc_config;
pub mod validation_config;

pub use correction_config::CorrectionConfig;
pub use database_config::DatabaseConfig;
pub use scan_config::ScanConfig;
pub use sproc_config::{CliOverrides, SprocConfig};
pub use validation_config::ValidationConfig;
