//! Console reader
//!
//! Pull-based read loop: scans lines, dispatches them in order and hands
//! back each finalized block as soon as it is queued. A queued block is
//! always returned before another line is read.

use super::dispatcher::{Dispatcher, ReaderStats};
use crate::adapters::scanner::LineScanner;
use crate::config::ReaderConfig;
use crate::domain::errors::Result;
use crate::ports::inbound::BlockSource;
use crate::ports::outbound::GroupFileStore;
use async_trait::async_trait;
use shared_types::Block;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

enum Step {
    Line,
    EndOfInput,
    Cancelled,
}

pub struct ConsoleReader<R> {
    scanner: LineScanner<R>,
    dispatcher: Dispatcher,
    blocks: mpsc::Receiver<Block>,
    shutdown: Option<watch::Receiver<bool>>,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleReader<R> {
    /// Reader over `input`; group files are read from `config.group_dir`.
    pub fn new(input: R, config: ReaderConfig) -> Result<Self> {
        Self::build(input, config, None)
    }

    /// Reader decoding group files through `store` instead of the filesystem.
    pub fn with_group_store(
        input: R,
        config: ReaderConfig,
        store: Arc<dyn GroupFileStore>,
    ) -> Result<Self> {
        Self::build(input, config, Some(store))
    }

    fn build(input: R, config: ReaderConfig, store: Option<Arc<dyn GroupFileStore>>) -> Result<Self> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.output_queue_capacity);

        Ok(Self {
            scanner: LineScanner::new(input),
            dispatcher: Dispatcher::new(&config, store, tx),
            blocks: rx,
            shutdown: None,
            finished: false,
        })
    }

    /// Stop reading once `shutdown` flips to `true`.
    ///
    /// In-flight assemblies are discarded and the reader reports end-of-stream.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Next finalized block, `Ok(None)` at end-of-stream.
    ///
    /// After an error or cancellation the reader is finished and only returns
    /// `Ok(None)`.
    pub async fn next_block(&mut self) -> Result<Option<Block>> {
        loop {
            if let Ok(block) = self.blocks.try_recv() {
                return Ok(Some(block));
            }
            if self.finished {
                return Ok(None);
            }

            let step = match self.shutdown.as_mut() {
                Some(shutdown) => {
                    tokio::select! {
                        biased;
                        _ = wait_for_shutdown(shutdown) => Ok(Step::Cancelled),
                        step = advance(&mut self.scanner, &mut self.dispatcher) => step,
                    }
                }
                None => advance(&mut self.scanner, &mut self.dispatcher).await,
            };

            match step {
                Ok(Step::Line) => {}
                Ok(Step::EndOfInput) => {
                    self.finished = true;
                    let discarded = self.dispatcher.abandon_all();
                    if discarded > 0 {
                        warn!(discarded, "[fire] End of input with incomplete assemblies");
                    }
                    info!(
                        lines = self.scanner.lines_seen(),
                        blocks = self.dispatcher.stats().blocks_emitted,
                        "[fire] End of input"
                    );
                }
                Ok(Step::Cancelled) => {
                    self.finished = true;
                    let discarded = self.dispatcher.abandon_all();
                    info!(discarded, "[fire] Reader cancelled");
                    return Ok(None);
                }
                Err(e) => {
                    self.finished = true;
                    self.dispatcher.abandon_all();
                    return Err(e);
                }
            }
        }
    }

    /// Stop reading and discard every in-flight assembly.
    pub fn abandon(&mut self) {
        self.finished = true;
        let discarded = self.dispatcher.abandon_all();
        debug!(discarded, "[fire] Reader abandoned");
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn stats(&self) -> ReaderStats {
        ReaderStats {
            lines_seen: self.scanner.lines_seen(),
            ..self.dispatcher.stats()
        }
    }
}

async fn advance<R: AsyncBufRead + Unpin>(
    scanner: &mut LineScanner<R>,
    dispatcher: &mut Dispatcher,
) -> Result<Step> {
    match scanner.next_line().await? {
        Some(line) => {
            dispatcher.dispatch(&line).await?;
            Ok(Step::Line)
        }
        None => Ok(Step::EndOfInput),
    }
}

/// Resolves once shutdown is requested; never resolves if the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let requested = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !requested {
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> BlockSource for ConsoleReader<R> {
    async fn next_block(&mut self) -> Result<Option<Block>> {
        ConsoleReader::next_block(self).await
    }
}

/// Run the read loop in its own task, pushing blocks into a bounded stream.
///
/// The stream ends after end-of-stream or right after the first error. The
/// task also stops when the stream is dropped, and yields the final stats.
pub fn spawn_block_stream<R>(
    mut reader: ConsoleReader<R>,
    capacity: usize,
) -> (ReceiverStream<Result<Block>>, JoinHandle<ReaderStats>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let handle = tokio::spawn(async move {
        loop {
            match reader.next_block().await {
                Ok(Some(block)) => {
                    if tx.send(Ok(block)).await.is_err() {
                        debug!("[fire] Block stream dropped by consumer");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            }
        }
        reader.abandon();
        reader.stats()
    });

    (ReceiverStream::new(rx), handle)
}
