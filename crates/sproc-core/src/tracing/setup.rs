//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Target used for policy-violation events.
pub const SECURITY_TARGET: &str = "sproc::security";

/// Initialize the sproc tracing/logging system.
///
/// Reads the `SPROC_LOG` environment variable for per-subsystem log levels.
/// Format: `SPROC_LOG=sproc_gateway=debug,sproc_analysis=info`
///
/// Falls back to `sproc=info` if `SPROC_LOG` is not set or is invalid.
///
/// Idempotent: only the first call installs the subscriber.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("SPROC_LOG")
            .unwrap_or_else(|_| EnvFilter::new("sproc=info,sproc_core=info,sproc_gateway=info,sproc_analysis=info"));

        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init();
    });
}
