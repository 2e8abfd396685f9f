//! # Assembly Registry
//!
//! In-flight assemblies keyed by height. Several assemblies may keep decoding
//! in the background, but lifecycle events always target the single active
//! one: the height of the most recent `BLOCK_WORK`.
//!
//! ## Security
//!
//! - The registry is bounded to `max_pending` assemblies; the oldest
//!   non-active ones are stopped and evicted first.

use super::assembly::BlockAssembly;
use crate::domain::errors::ProtocolViolation;
use crate::domain::events::AssemblyBegin;
use std::collections::HashMap;

pub struct AssemblyRegistry {
    assemblies: HashMap<u64, BlockAssembly>,
    active: Option<u64>,
    max_pending: usize,
    decode_concurrency: usize,
    next_seq: u64,
}

impl AssemblyRegistry {
    pub fn new(max_pending: usize, decode_concurrency: usize) -> Self {
        Self {
            assemblies: HashMap::new(),
            active: None,
            max_pending: max_pending.max(1),
            decode_concurrency,
            next_seq: 0,
        }
    }

    /// Open or re-open the assembly for `begin.height` and make it active.
    ///
    /// Returns `true` when an existing assembly was reused.
    pub fn begin(&mut self, begin: AssemblyBegin) -> Result<bool, ProtocolViolation> {
        let height = begin.height;
        let reused = match self.assemblies.get_mut(&height) {
            Some(assembly) => {
                assembly.begin(begin)?;
                true
            }
            None => {
                let assembly = BlockAssembly::open(begin, self.decode_concurrency, self.next_seq);
                self.next_seq += 1;
                self.assemblies.insert(height, assembly);
                false
            }
        };
        self.active = Some(height);
        Ok(reused)
    }

    pub fn active_mut(&mut self) -> Option<&mut BlockAssembly> {
        let height = self.active?;
        self.assemblies.get_mut(&height)
    }

    pub fn active_height(&self) -> Option<u64> {
        self.active
    }

    /// Remove the active assembly, which must be tracking `height`.
    pub fn take_active(&mut self, height: u64) -> Result<BlockAssembly, ProtocolViolation> {
        match self.active {
            None => Err(ProtocolViolation::NoActiveAssembly { height }),
            Some(active) if active != height => Err(ProtocolViolation::HeightMismatch {
                active,
                received: height,
            }),
            Some(_) => {
                self.active = None;
                self.assemblies
                    .remove(&height)
                    .ok_or(ProtocolViolation::NoActiveAssembly { height })
            }
        }
    }

    /// Enforce the maximum pending assemblies limit.
    ///
    /// Stops and evicts the oldest non-active assemblies while the limit is
    /// exceeded. Returns the evicted heights.
    pub fn enforce_max_pending(&mut self) -> Vec<u64> {
        if self.assemblies.len() <= self.max_pending {
            return vec![];
        }

        // Sort by opening order to find oldest
        let mut entries: Vec<_> = self
            .assemblies
            .iter()
            .filter(|(height, _)| Some(**height) != self.active)
            .map(|(height, a)| (*height, a.opened_seq()))
            .collect();
        entries.sort_by_key(|(_, seq)| *seq);

        let to_remove = self.assemblies.len() - self.max_pending;
        let evicted: Vec<u64> = entries.iter().take(to_remove).map(|(h, _)| *h).collect();

        for height in &evicted {
            if let Some(assembly) = self.assemblies.remove(height) {
                assembly.abandon();
            }
        }

        evicted
    }

    /// Stop and drop every assembly. Returns how many were discarded.
    pub fn abandon_all(&mut self) -> usize {
        self.active = None;
        let count = self.assemblies.len();
        for (_, assembly) in self.assemblies.drain() {
            assembly.abandon();
        }
        count
    }

    pub fn get(&self, height: u64) -> Option<&BlockAssembly> {
        self.assemblies.get(&height)
    }

    pub fn len(&self) -> usize {
        self.assemblies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assemblies.is_empty()
    }
}
