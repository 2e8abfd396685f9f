//! Domain invariants for assembled blocks
//!
//! Checked in debug builds at finalization and exercised by the test suites.

use super::canonical::CanonicalOrder;
use shared_types::Block;

/// INVARIANT-1: Canonical Order
/// Transactions appear exactly in the order reported by `BLOCK_WORK`.
pub fn invariant_canonical_order(block: &Block, order: &CanonicalOrder) -> bool {
    block.transactions.len() == order.len()
        && block
            .transactions
            .iter()
            .zip(order.ids())
            .enumerate()
            .all(|(index, (trx, id))| trx.id == *id && trx.index == index as u64)
}

/// INVARIANT-2: Monotonic Ordinals
/// Every transaction has `begin < end` and transaction spans never move
/// backwards: each one starts where the previous one ended or later.
pub fn invariant_monotonic_ordinals(block: &Block) -> bool {
    let mut previous_end = 0u64;
    for trx in &block.transactions {
        if trx.begin_ordinal >= trx.end_ordinal || trx.begin_ordinal < previous_end {
            return false;
        }
        previous_end = trx.end_ordinal;
    }
    true
}

/// INVARIANT-3: Nesting
/// Instruction and log ordinals stay within (or abut) their transaction's span.
pub fn invariant_nested_spans(block: &Block) -> bool {
    block.transactions.iter().all(|trx| {
        trx.instructions.iter().all(|instruction| {
            instruction.begin_ordinal >= trx.begin_ordinal
                && instruction.begin_ordinal <= instruction.end_ordinal
                && instruction.end_ordinal < trx.end_ordinal
                && instruction
                    .logs
                    .iter()
                    .all(|log| log.ordinal >= trx.begin_ordinal && log.ordinal < trx.end_ordinal)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Instruction, Transaction};

    fn block_with(txs: Vec<Transaction>) -> Block {
        Block {
            transactions: txs,
            ..Default::default()
        }
    }

    fn spanned(id: &str, index: u64, begin: u64, end: u64) -> Transaction {
        Transaction {
            index,
            begin_ordinal: begin,
            end_ordinal: end,
            ..Transaction::new(id)
        }
    }

    #[test]
    fn test_monotonic_accepts_abutting_spans() {
        let block = block_with(vec![spanned("a", 0, 0, 1), spanned("b", 1, 1, 2)]);
        assert!(invariant_monotonic_ordinals(&block));
    }

    #[test]
    fn test_monotonic_rejects_overlap() {
        let block = block_with(vec![spanned("a", 0, 0, 3), spanned("b", 1, 2, 4)]);
        assert!(!invariant_monotonic_ordinals(&block));
    }

    #[test]
    fn test_monotonic_rejects_empty_span() {
        let block = block_with(vec![spanned("a", 0, 2, 2)]);
        assert!(!invariant_monotonic_ordinals(&block));
    }

    #[test]
    fn test_nested_rejects_escaping_instruction() {
        let trx = spanned("a", 0, 0, 3).with_instructions(vec![Instruction::new("p", 1, 3)]);
        assert!(!invariant_nested_spans(&block_with(vec![trx])));
    }

    #[test]
    fn test_canonical_order_checks_indexes() {
        let mut order = CanonicalOrder::new();
        order.merge(vec!["a".to_string(), "b".to_string()]);

        let good = block_with(vec![spanned("a", 0, 0, 1), spanned("b", 1, 1, 2)]);
        assert!(invariant_canonical_order(&good, &order));

        let swapped = block_with(vec![spanned("b", 0, 0, 1), spanned("a", 1, 1, 2)]);
        assert!(!invariant_canonical_order(&swapped, &order));
    }
}
