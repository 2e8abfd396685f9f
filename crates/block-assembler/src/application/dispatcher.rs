//! Protocol dispatcher
//!
//! Routes one instrumentation line at a time to its lifecycle handler.
//! Lines are processed strictly in stream order; only group decoding runs
//! concurrently, inside each assembly's task group.

use super::decoder::GroupDecoder;
use super::registry::AssemblyRegistry;
use crate::adapters::group_file::FsGroupFileStore;
use crate::config::ReaderConfig;
use crate::domain::errors::{AssemblerError, ProtocolViolation, Result};
use crate::domain::events::{AssemblyBegin, AssemblyEnd, Event};
use crate::domain::root::RootTracker;
use crate::domain::session::{SessionNegotiator, Variant};
use crate::ports::outbound::GroupFileStore;
use serde::Serialize;
use shared_types::Block;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Counters reported by the reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    /// Raw lines read from the input, instrumentation or not
    pub lines_seen: u64,
    pub events_dispatched: u64,
    pub blocks_emitted: u64,
    pub groups_submitted: u64,
}

pub struct Dispatcher {
    session: SessionNegotiator,
    registry: AssemblyRegistry,
    root: RootTracker,
    decoder: Option<GroupDecoder>,
    output: mpsc::Sender<Block>,
    stats: ReaderStats,
}

impl Dispatcher {
    /// Build a dispatcher emitting into `output`.
    ///
    /// `store` overrides the filesystem store derived from `config.group_dir`.
    pub fn new(
        config: &ReaderConfig,
        store: Option<Arc<dyn GroupFileStore>>,
        output: mpsc::Sender<Block>,
    ) -> Self {
        let store = store.or_else(|| {
            config
                .group_dir
                .as_ref()
                .map(|dir| Arc::new(FsGroupFileStore::new(dir)) as Arc<dyn GroupFileStore>)
        });
        let decoder = store.map(|store| {
            GroupDecoder::new(store, config.redaction.clone(), config.keep_group_files)
        });

        Self {
            session: SessionNegotiator::new(),
            registry: AssemblyRegistry::new(
                config.max_pending_assemblies,
                config.decode_concurrency,
            ),
            root: RootTracker::new(),
            decoder,
            output,
            stats: ReaderStats::default(),
        }
    }

    /// Handle one instrumentation line.
    pub async fn dispatch(&mut self, line: &str) -> Result<()> {
        let event = match Event::parse(line) {
            Ok(event) => event,
            Err(ProtocolViolation::UnknownEvent(keyword)) => {
                if self.session.variant() == Some(Variant::Detailed) {
                    return Err(AssemblerError::protocol(
                        line,
                        ProtocolViolation::UnknownEvent(keyword),
                    ));
                }
                debug!(keyword = %keyword, "[fire] Skipping unknown event");
                return Ok(());
            }
            Err(violation) => return Err(AssemblerError::protocol(line, violation)),
        };
        self.stats.events_dispatched += 1;

        match event {
            Event::SessionHandshake {
                format_version,
                variant,
                node_version,
            } => self.on_handshake(line, format_version, &variant, &node_version),
            other => {
                let variant = self.session.variant().ok_or_else(|| {
                    AssemblerError::protocol(line, ProtocolViolation::MissingHandshake)
                })?;
                self.route(line, other, variant).await
            }
        }
    }

    async fn route(&mut self, line: &str, event: Event, variant: Variant) -> Result<()> {
        if variant == Variant::Minimal && event.kind().is_detailed_only() {
            debug!(
                event = event.kind().keyword(),
                "[fire] Ignoring detailed-only event in minimal session"
            );
            return Ok(());
        }

        match event {
            Event::AssemblyBegin(begin) => self.on_begin(line, begin),
            Event::GroupProduced { file_name } => self.on_group(line, file_name),
            Event::GroupsComplete => self.on_groups_complete(line),
            Event::AssemblyEnd(end) => self.on_end(line, end, variant).await,
            Event::AssemblyFailed { height, reason } => self.on_failed(line, height, reason),
            Event::RootAdvanced { height } => {
                self.root.advance(height);
                debug!(height, "[fire] Root advanced");
                Ok(())
            }
            Event::SessionHandshake { .. } => Err(AssemblerError::protocol(
                line,
                ProtocolViolation::DuplicateHandshake,
            )),
        }
    }

    fn on_handshake(
        &mut self,
        line: &str,
        format_version: u64,
        variant: &str,
        node_version: &str,
    ) -> Result<()> {
        let session = self
            .session
            .establish(format_version, variant, node_version)
            .map_err(|v| AssemblerError::protocol(line, v))?;

        if session.variant == Variant::Detailed && self.decoder.is_none() {
            error!("[fire] Detailed session requires a group directory");
            return Err(AssemblerError::Configuration(
                "detailed variant requires a group file directory".to_string(),
            ));
        }

        info!(
            format_version = session.format_version,
            variant = %session.variant,
            node_version = %session.node_version,
            "[fire] Session established"
        );
        Ok(())
    }

    fn on_begin(&mut self, line: &str, begin: AssemblyBegin) -> Result<()> {
        let height = begin.height;
        let work_kind = begin.work_kind;
        let reported = begin.transaction_ids.len();

        let reused = self
            .registry
            .begin(begin)
            .map_err(|v| AssemblerError::protocol(line, v))?;
        debug!(
            height,
            work_kind = %work_kind,
            transactions = reported,
            reused,
            "[fire] Block work"
        );

        for evicted in self.registry.enforce_max_pending() {
            warn!(height = evicted, "[fire] Registry full, evicted assembly");
        }
        Ok(())
    }

    fn on_group(&mut self, line: &str, file_name: String) -> Result<()> {
        let decoder = self.decoder.as_ref().ok_or_else(|| {
            AssemblerError::Configuration("group file received without a group store".to_string())
        })?;
        let assembly = self.registry.active_mut().ok_or_else(|| {
            AssemblerError::protocol(line, ProtocolViolation::GroupOutsideAssembly)
        })?;

        let submitted = assembly
            .submit_group(decoder, file_name)
            .map_err(|v| AssemblerError::protocol(line, v))?;
        if submitted {
            self.stats.groups_submitted += 1;
        }
        Ok(())
    }

    fn on_groups_complete(&mut self, line: &str) -> Result<()> {
        let assembly = self.registry.active_mut().ok_or_else(|| {
            AssemblerError::protocol(line, ProtocolViolation::GroupOutsideAssembly)
        })?;
        assembly
            .mark_groups_complete()
            .map_err(|v| AssemblerError::protocol(line, v))?;
        debug!(
            height = assembly.height(),
            in_flight = assembly.decodes_in_flight(),
            "[fire] Groups complete"
        );
        Ok(())
    }

    async fn on_end(&mut self, line: &str, end: AssemblyEnd, variant: Variant) -> Result<()> {
        let height = end.height;
        let mut assembly = self
            .registry
            .take_active(height)
            .map_err(|v| AssemblerError::protocol(line, v))?;
        assembly
            .end()
            .map_err(|v| AssemblerError::protocol(line, v))?;

        let block = match assembly.finalize(&end, variant, self.root.current()).await {
            Ok(block) => block,
            Err(e) => {
                error!(height, error = %e, "[fire] Finalization failed");
                return Err(e);
            }
        };

        let transactions = block.transaction_count();
        self.output
            .send(block)
            .await
            .map_err(|_| AssemblerError::OutputClosed { height })?;
        self.stats.blocks_emitted += 1;

        debug!(height, transactions, "[fire] Block finalized");
        Ok(())
    }

    fn on_failed(&mut self, line: &str, height: u64, reason: String) -> Result<()> {
        let mut assembly = self
            .registry
            .take_active(height)
            .map_err(|v| AssemblerError::protocol(line, v))?;
        assembly.fail();
        error!(height, reason = %reason, "[fire] Node reported block failure");
        Err(AssemblerError::AssemblyFailed { height, reason })
    }

    /// Stop every in-flight assembly. Returns how many were discarded.
    pub fn abandon_all(&mut self) -> usize {
        self.registry.abandon_all()
    }

    pub fn pending_assemblies(&self) -> usize {
        self.registry.len()
    }

    pub fn session_variant(&self) -> Option<Variant> {
        self.session.variant()
    }

    pub fn last_irreversible_height(&self) -> u64 {
        self.root.current()
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }
}
