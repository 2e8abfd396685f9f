//! Parallel-group decoding
//!
//! Each assembly owns a [`DecodeTaskGroup`]: a bounded set of decode tasks
//! whose first failure is held back until the assembly waits on the group at
//! finalization. Decoded groups are appended to a shared accumulator.

use crate::adapters::group_file::decode_group_file;
use crate::domain::errors::DecodeError;
use crate::domain::redaction::RedactionPolicy;
use crate::ports::outbound::GroupFileStore;
use parking_lot::Mutex;
use shared_types::Transaction;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Decoded groups of one assembly, appended by decode tasks in completion order
pub type GroupAccumulator = Arc<Mutex<Vec<Vec<Transaction>>>>;

/// Bounded task group scoped to one assembly
pub struct DecodeTaskGroup {
    height: u64,
    tasks: JoinSet<Result<(), DecodeError>>,
    permits: Arc<Semaphore>,
    stopped: bool,
}

impl DecodeTaskGroup {
    pub fn new(height: u64, concurrency: usize) -> Self {
        Self {
            height,
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            stopped: false,
        }
    }

    /// Submit a decode job. Returns `false` when the group was already
    /// stopped, in which case the job is dropped.
    pub fn submit<F>(&mut self, job: F) -> bool
    where
        F: Future<Output = Result<(), DecodeError>> + Send + 'static,
    {
        if self.stopped {
            debug!(height = self.height, "[fire] Decode group stopped, submission dropped");
            return false;
        }

        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            // Closed semaphore means the group was stopped while queued
            let Ok(_permit) = permits.acquire_owned().await else {
                return Ok(());
            };
            job.await
        });
        true
    }

    /// Wait for every submitted job. The first failure stops the remaining
    /// jobs and is returned.
    pub async fn wait(&mut self) -> Result<(), DecodeError> {
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => Err(DecodeError::TaskFailed(e.to_string())),
            };

            if let Err(e) = outcome {
                self.stop();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Abort in-flight jobs and drop any later submission.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.permits.close();
        self.tasks.abort_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Jobs spawned and not yet joined
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}

/// Builds decode jobs: read, decode, optionally delete, redact, append.
#[derive(Clone)]
pub struct GroupDecoder {
    store: Arc<dyn GroupFileStore>,
    redaction: Arc<RedactionPolicy>,
    keep_files: bool,
}

impl GroupDecoder {
    pub fn new(store: Arc<dyn GroupFileStore>, redaction: RedactionPolicy, keep_files: bool) -> Self {
        Self {
            store,
            redaction: Arc::new(redaction),
            keep_files,
        }
    }

    pub fn job(
        &self,
        height: u64,
        file_name: String,
        sink: GroupAccumulator,
    ) -> impl Future<Output = Result<(), DecodeError>> + Send + 'static {
        let store = Arc::clone(&self.store);
        let redaction = Arc::clone(&self.redaction);
        let keep_files = self.keep_files;

        async move {
            let bytes = store.read(&file_name).await?;
            let mut transactions = decode_group_file(&file_name, &bytes)?;

            if !keep_files {
                if let Err(e) = store.remove(&file_name).await {
                    warn!(height, file = %file_name, error = %e, "[fire] Failed to delete group file");
                }
            }

            let redacted: usize = transactions
                .iter_mut()
                .map(|trx| redaction.apply(trx))
                .sum();

            debug!(
                height,
                file = %file_name,
                transactions = transactions.len(),
                redacted,
                "[fire] Group decoded"
            );

            sink.lock().push(transactions);
            Ok(())
        }
    }
}
