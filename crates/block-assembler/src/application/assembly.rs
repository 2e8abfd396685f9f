//! Block assembly
//!
//! Per-height aggregation context: canonical order, decoded groups and the
//! decode task group feeding them. Finalization consumes the assembly.

use super::decoder::{DecodeTaskGroup, GroupAccumulator, GroupDecoder};
use crate::domain::canonical::CanonicalOrder;
use crate::domain::errors::{AssemblerError, ProtocolViolation, Result};
use crate::domain::events::{AssemblyBegin, AssemblyEnd};
use crate::domain::invariants::{
    invariant_canonical_order, invariant_monotonic_ordinals, invariant_nested_spans,
};
use crate::domain::ordinals::assign_ordinals;
use crate::domain::session::Variant;
use crate::domain::state::{AssemblyState, Transition, WorkKind};
use shared_types::Block;
use tracing::{debug, warn};

pub struct BlockAssembly {
    height: u64,
    parent_height: u64,
    parent_id: String,
    work_kind: WorkKind,
    order: CanonicalOrder,
    groups: GroupAccumulator,
    tasks: DecodeTaskGroup,
    state: AssemblyState,
    /// Registry sequence number, used to find the oldest assemblies
    opened_seq: u64,
}

impl BlockAssembly {
    pub fn open(begin: AssemblyBegin, decode_concurrency: usize, opened_seq: u64) -> Self {
        let mut order = CanonicalOrder::new();
        order.merge(begin.transaction_ids);

        Self {
            height: begin.height,
            parent_height: begin.parent_height,
            parent_id: begin.parent_id,
            work_kind: begin.work_kind,
            order,
            groups: GroupAccumulator::default(),
            tasks: DecodeTaskGroup::new(begin.height, decode_concurrency),
            state: AssemblyState::Working,
            opened_seq,
        }
    }

    /// Re-open with another work report for the same height.
    ///
    /// Metadata is replaced; new transaction ids are appended after the known
    /// ones. Returns how many ids were added.
    pub fn begin(&mut self, begin: AssemblyBegin) -> std::result::Result<usize, ProtocolViolation> {
        self.transition(Transition::Begin, "BLOCK_WORK")?;
        self.parent_height = begin.parent_height;
        self.parent_id = begin.parent_id;
        self.work_kind = begin.work_kind;
        Ok(self.order.merge(begin.transaction_ids))
    }

    /// Submit one group file for decoding. Returns `false` if the decode group
    /// was already stopped.
    pub fn submit_group(
        &mut self,
        decoder: &GroupDecoder,
        file_name: String,
    ) -> std::result::Result<bool, ProtocolViolation> {
        if !self.state.accepts_groups() {
            return Err(self.invalid("BATCH_FILE"));
        }
        let job = decoder.job(self.height, file_name, self.groups.clone());
        Ok(self.tasks.submit(job))
    }

    pub fn mark_groups_complete(&mut self) -> std::result::Result<(), ProtocolViolation> {
        self.transition(Transition::GroupsComplete, "BATCHES_END")
    }

    /// Enter finalization; no more groups are accepted afterwards.
    pub fn end(&mut self) -> std::result::Result<(), ProtocolViolation> {
        self.transition(Transition::End, "BLOCK_END")
    }

    /// Stop decoding and mark the assembly failed.
    pub fn fail(&mut self) {
        self.tasks.stop();
        if let Some(next) = self.state.on(Transition::Fail) {
            self.state = next;
        }
    }

    /// Discard the assembly, aborting its decode tasks.
    pub fn abandon(mut self) {
        self.tasks.stop();
        debug!(
            height = self.height,
            state = ?self.state,
            "[fire] Assembly abandoned"
        );
    }

    /// Build the finished block.
    ///
    /// In the detailed variant this waits for every decode task, places the
    /// decoded transactions in canonical order and fails on a count mismatch.
    /// The minimal variant synthesizes bare transactions from the canonical
    /// ids. Ordinals are then assigned block-wide.
    pub async fn finalize(
        mut self,
        end: &AssemblyEnd,
        variant: Variant,
        last_irreversible_height: u64,
    ) -> Result<Block> {
        debug_assert_eq!(self.state, AssemblyState::Finalizing);

        let mut transactions = match variant {
            Variant::Minimal => self.order.synthesize(),
            Variant::Detailed => {
                if let Err(source) = self.tasks.wait().await {
                    self.fail();
                    return Err(AssemblerError::Decode {
                        height: self.height,
                        source,
                    });
                }
                let groups = std::mem::take(&mut *self.groups.lock());
                self.order.arrange(self.height, groups)?
            }
        };
        if let Err(source) = assign_ordinals(&mut transactions) {
            self.fail();
            return Err(AssemblerError::Decode {
                height: self.height,
                source,
            });
        }

        let parent_id = if end.parent_id.is_empty() {
            std::mem::take(&mut self.parent_id)
        } else {
            end.parent_id.clone()
        };

        let block = Block {
            height: self.height,
            id: end.block_id.clone(),
            parent_height: self.parent_height,
            parent_id,
            genesis_unix_timestamp: end.genesis_unix_timestamp,
            clock_unix_timestamp: end.clock_unix_timestamp,
            last_irreversible_height,
            transactions,
        };

        debug_assert!(invariant_canonical_order(&block, &self.order));
        debug_assert!(invariant_monotonic_ordinals(&block));
        // Nesting depends on the ordinals reported by the node
        if !invariant_nested_spans(&block) {
            warn!(height = self.height, "[fire] Instruction ordinals escape their transaction span");
        }

        if let Some(next) = self.state.on(Transition::Finalized) {
            self.state = next;
        }
        Ok(block)
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    pub fn work_kind(&self) -> WorkKind {
        self.work_kind
    }

    pub fn order(&self) -> &CanonicalOrder {
        &self.order
    }

    pub fn opened_seq(&self) -> u64 {
        self.opened_seq
    }

    pub fn decodes_in_flight(&self) -> usize {
        self.tasks.in_flight()
    }

    fn transition(
        &mut self,
        event: Transition,
        keyword: &'static str,
    ) -> std::result::Result<(), ProtocolViolation> {
        let next = self.state.on(event).ok_or_else(|| self.invalid(keyword))?;
        self.state = next;
        Ok(())
    }

    fn invalid(&self, event: &'static str) -> ProtocolViolation {
        ProtocolViolation::InvalidTransition {
            height: self.height,
            state: format!("{:?}", self.state),
            event,
        }
    }
}
