//! # Assembler Telemetry
//!
//! Logging for the block assembler reader: a `tracing-subscriber` registry
//! with an env filter and either plain or JSON output on stderr.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assembler_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FIRE_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `FIRE_JSON_LOGS` | `false` | JSON formatted logs |
//! | `FIRE_CONSOLE_OUTPUT` | `true` | Emit logs at all |
//! | `FIRE_SERVICE_NAME` | `fire-reader` | Service name |

mod config;
mod logging;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging for the process.
///
/// Returns a guard to hold for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service_name, "Shutting down telemetry");
    }
}
