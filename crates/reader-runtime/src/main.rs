//! # Fire Reader
//!
//! Reads a validator's instrumentation log from stdin (or `FIRE_INPUT`) and
//! prints one JSON document per finalized block on stdout.
//!
//! ```text
//! validator ──stdout──→ fire-reader ──JSON lines──→ consumer
//!     │                      ↑
//!     └── group files ───────┘  (FIRE_GROUP_DIR, detailed variant)
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use assembler_telemetry::{init_telemetry, log_reader_event, TelemetryConfig};
use block_assembler::ReaderConfig;
use reader_runtime::{open_input, ReaderRuntime};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    // Load configuration
    let config = ReaderConfig::from_env();
    config.validate().context("Invalid reader configuration")?;
    info!(
        group_dir = ?config.group_dir,
        keep_group_files = config.keep_group_files,
        decode_concurrency = config.decode_concurrency,
        output_queue_capacity = config.output_queue_capacity,
        "[fire] Configuration loaded"
    );

    let runtime = Arc::new(ReaderRuntime::new(config));
    let input = open_input().await?;

    // Ctrl+C stops the reader; blocks already printed stay valid
    let signal = Arc::clone(&runtime);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal.shutdown(),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let stats = runtime.run(input, tokio::io::stdout()).await?;

    log_reader_event!(
        info,
        "[fire] Reader finished",
        lines_seen = stats.lines_seen,
        events_dispatched = stats.events_dispatched,
        blocks_emitted = stats.blocks_emitted,
        groups_submitted = stats.groups_submitted
    );

    Ok(())
}
