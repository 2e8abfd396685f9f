//! # Reader Runtime
//!
//! Drives a [`ConsoleReader`] over an input stream and writes every
//! finalized block as one JSON line.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (stderr)
//! 2. Load `ReaderConfig` from the environment
//! 3. Open stdin, or the file named by `FIRE_INPUT`
//! 4. Run the reader until end of input, a fatal error or Ctrl+C

use anyhow::{Context, Result};
use assembler_telemetry::{log_assembly_event, log_reader_event};
use block_assembler::{spawn_block_stream, ConsoleReader, ReaderConfig, ReaderStats};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing::error;

/// Boxed input so stdin and files share one reader type
pub type Input = Box<dyn AsyncBufRead + Unpin + Send>;

/// Environment variable naming an input file instead of stdin
pub const INPUT_ENV: &str = "FIRE_INPUT";

/// Open the configured input: the `FIRE_INPUT` file if set, stdin otherwise.
pub async fn open_input() -> Result<Input> {
    match std::env::var(INPUT_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open input file {}", path))?;
            log_reader_event!(info, "[fire] Reading from file", path = %path);
            Ok(Box::new(tokio::io::BufReader::new(file)))
        }
        _ => {
            log_reader_event!(info, "[fire] Reading from stdin");
            Ok(Box::new(tokio::io::BufReader::new(tokio::io::stdin())))
        }
    }
}

/// The reader runtime owning configuration and the shutdown channel.
pub struct ReaderRuntime {
    config: ReaderConfig,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl ReaderRuntime {
    pub fn new(config: ReaderConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read `input` to the end, writing one JSON line per block to `output`.
    ///
    /// Returns the reader statistics once the input is exhausted or shutdown
    /// was requested; a fatal assembler error is returned as is.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<ReaderStats>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let reader = ConsoleReader::new(input, self.config.clone())
            .context("Invalid reader configuration")?
            .with_shutdown(self.shutdown_rx.clone());
        let (mut blocks, handle) = spawn_block_stream(reader, self.config.output_queue_capacity);

        while let Some(next) = blocks.next().await {
            let block = match next {
                Ok(block) => block,
                Err(e) => {
                    error!(
                        height = ?e.height(),
                        protocol = e.is_protocol(),
                        error = %e,
                        "[fire] Reader stopped on fatal error"
                    );
                    return Err(e).context("Block assembly failed");
                }
            };

            let mut line = serde_json::to_vec(&block).context("Failed to encode block")?;
            line.push(b'\n');
            output
                .write_all(&line)
                .await
                .context("Failed to write block")?;

            log_assembly_event!(
                info,
                "[fire] Block emitted",
                block.height,
                transactions = block.transaction_count(),
                last_irreversible = block.last_irreversible_height
            );
        }

        output.flush().await.context("Failed to flush output")?;
        let stats = handle.await.context("Reader task failed")?;
        Ok(stats)
    }

    /// Ask the running reader to stop.
    ///
    /// In-flight assemblies are discarded; blocks already written stay valid.
    pub fn shutdown(&self) {
        log_reader_event!(info, "[fire] Shutdown requested");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }
}
