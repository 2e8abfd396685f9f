//! Block-wide ordinal assignment
//!
//! Ordinals reported by the node are relative to each transaction. At
//! finalization they are shifted into one block-wide space, walking
//! transactions in canonical order. The result depends only on canonical
//! order and on each transaction's own relative ordinals.

use super::errors::DecodeError;
use shared_types::Transaction;

/// Shift every ordinal in `transactions` into the block-wide space.
///
/// Each transaction's begin and all nested instruction and log ordinals are
/// offset by the running `last_ordinal`; the transaction's end becomes one
/// past the highest ordinal seen inside it and seeds the next transaction.
/// Returns the final `last_ordinal`.
///
/// # Errors
///
/// [`DecodeError::OrdinalOverflow`] when a transaction's ordinals do not fit
/// in `u64` after shifting. Transactions are left partially shifted.
pub fn assign_ordinals(transactions: &mut [Transaction]) -> Result<u64, DecodeError> {
    let mut last_ordinal = 0u64;

    for trx in transactions.iter_mut() {
        let overflow = || DecodeError::OrdinalOverflow { id: trx.id.clone() };
        let shift = |ordinal: u64| ordinal.checked_add(last_ordinal);

        let begin = shift(trx.begin_ordinal).ok_or_else(overflow)?;
        let mut max_seen = begin;

        for instruction in trx.instructions.iter_mut() {
            instruction.begin_ordinal = shift(instruction.begin_ordinal).ok_or_else(overflow)?;
            instruction.end_ordinal = shift(instruction.end_ordinal).ok_or_else(overflow)?;
            max_seen = max_seen
                .max(instruction.begin_ordinal)
                .max(instruction.end_ordinal);

            for log in instruction.logs.iter_mut() {
                log.ordinal = shift(log.ordinal).ok_or_else(overflow)?;
                max_seen = max_seen.max(log.ordinal);
            }
        }

        let end = max_seen.checked_add(1).ok_or_else(overflow)?;
        trx.begin_ordinal = begin;
        trx.end_ordinal = end;
        last_ordinal = end;
    }

    Ok(last_ordinal)
}
