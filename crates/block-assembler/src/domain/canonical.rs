//! Canonical transaction order
//!
//! The id vector reported by `BLOCK_WORK` is the single source of truth for
//! final transaction indexing, whatever order the parallel groups decode in.

use super::errors::{AssemblerError, DecodeError};
use shared_types::Transaction;
use std::collections::HashMap;

/// Ordered, duplicate-free transaction id vector
#[derive(Debug, Clone, Default)]
pub struct CanonicalOrder {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl CanonicalOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append ids not seen yet, keeping first-seen positions.
    ///
    /// Returns how many ids were added.
    pub fn merge<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = 0;
        for id in ids {
            if self.positions.contains_key(&id) {
                continue;
            }
            self.positions.insert(id.clone(), self.ids.len());
            self.ids.push(id);
            added += 1;
        }
        added
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Place decoded group transactions at their canonical positions.
    ///
    /// Fails with `AssemblyMismatch` when the decoded count differs from the
    /// canonical length (or a duplicate leaves a position empty), and with a
    /// decode error when a transaction id is not part of the order.
    pub fn arrange(
        &self,
        height: u64,
        groups: Vec<Vec<Transaction>>,
    ) -> Result<Vec<Transaction>, AssemblerError> {
        let decoded: usize = groups.iter().map(Vec::len).sum();
        if decoded != self.ids.len() {
            return Err(AssemblerError::AssemblyMismatch {
                height,
                decoded,
                expected: self.ids.len(),
            });
        }

        let mut slots: Vec<Option<Transaction>> = vec![None; self.ids.len()];
        for mut trx in groups.into_iter().flatten() {
            let position = self.position(&trx.id).ok_or_else(|| AssemblerError::Decode {
                height,
                source: DecodeError::UnknownTransaction { id: trx.id.clone() },
            })?;
            trx.index = position as u64;
            slots[position] = Some(trx);
        }

        let placed = slots.iter().filter(|slot| slot.is_some()).count();
        if placed != self.ids.len() {
            return Err(AssemblerError::AssemblyMismatch {
                height,
                decoded: placed,
                expected: self.ids.len(),
            });
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Bare transactions for streams that carry no execution detail
    pub fn synthesize(&self) -> Vec<Transaction> {
        self.ids
            .iter()
            .enumerate()
            .map(|(index, id)| Transaction {
                index: index as u64,
                ..Transaction::new(id.clone())
            })
            .collect()
    }
}
