//! # Core Block Entities
//!
//! Output model of the Block Assembler.
//!
//! ## Clusters
//!
//! - **Block**: `Block`, the finalized, canonically ordered unit handed to consumers
//! - **Execution trace**: `Transaction`, `Instruction`, `LogEntry`
//! - **State deltas**: `AccountChange`, `BalanceChange`
//!
//! Every ordinal field is zero (or relative to its transaction) until the
//! assembler finalizes the block; only finalized blocks carry block-wide
//! ordinals.

use serde::{Deserialize, Serialize};

// =============================================================================
// CLUSTER A: THE BLOCK
// =============================================================================

/// A fully assembled block, emitted exactly once per height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Block {
    /// Block height (slot) in the chain.
    pub height: u64,
    /// Block identifier (hash) reported by the node.
    pub id: String,
    /// Height of the parent block.
    pub parent_height: u64,
    /// Identifier of the parent block.
    pub parent_id: String,
    /// Genesis unix timestamp reported with the block.
    pub genesis_unix_timestamp: u64,
    /// Clock unix timestamp reported with the block.
    pub clock_unix_timestamp: u64,
    /// Latest irreversible height known when the block was finalized.
    ///
    /// Zero when no root was reported yet.
    pub last_irreversible_height: u64,
    /// Transactions in canonical order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Number of transactions carried by the block.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Transaction ids in block order.
    pub fn transaction_ids(&self) -> Vec<&str> {
        self.transactions.iter().map(|t| t.id.as_str()).collect()
    }

    /// Highest ordinal stamped anywhere in the block (the last transaction's end).
    pub fn last_ordinal(&self) -> u64 {
        self.transactions
            .last()
            .map(|t| t.end_ordinal)
            .unwrap_or(0)
    }
}

// =============================================================================
// CLUSTER B: EXECUTION TRACE
// =============================================================================

/// A transaction as reported by the instrumented node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Transaction {
    /// Transaction id (first signature).
    pub id: String,
    /// Position in the canonical order vector, assigned at finalization.
    pub index: u64,
    /// Whether execution failed.
    pub failed: bool,
    /// Failure description when `failed` is set.
    pub error: Option<String>,
    /// First ordinal covered by this transaction.
    pub begin_ordinal: u64,
    /// One past the last ordinal covered by this transaction.
    pub end_ordinal: u64,
    /// Instructions in execution order.
    pub instructions: Vec<Instruction>,
}

impl Transaction {
    /// Create a bare transaction carrying only its id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn with_failure(mut self, error: impl Into<String>) -> Self {
        self.failed = true;
        self.error = Some(error.into());
        self
    }

    /// Total number of log entries across all instructions.
    pub fn log_count(&self) -> usize {
        self.instructions.iter().map(|i| i.logs.len()).sum()
    }
}

/// One (possibly nested) program invocation inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Instruction {
    /// Invoked program id.
    pub program_id: String,
    /// Call depth, 1 for top-level instructions.
    pub depth: u32,
    /// Index of the parent instruction within the transaction, if nested.
    pub parent_index: Option<u32>,
    pub begin_ordinal: u64,
    pub end_ordinal: u64,
    /// Log lines emitted while this instruction was executing.
    pub logs: Vec<LogEntry>,
    /// Account data changes; subject to redaction.
    pub account_changes: Vec<AccountChange>,
    /// Lamport balance changes; never redacted.
    pub balance_changes: Vec<BalanceChange>,
}

impl Instruction {
    pub fn new(program_id: impl Into<String>, begin_ordinal: u64, end_ordinal: u64) -> Self {
        Self {
            program_id: program_id.into(),
            depth: 1,
            begin_ordinal,
            end_ordinal,
            ..Default::default()
        }
    }

    pub fn with_logs(mut self, logs: Vec<LogEntry>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_account_changes(mut self, changes: Vec<AccountChange>) -> Self {
        self.account_changes = changes;
        self
    }

    pub fn with_balance_changes(mut self, changes: Vec<BalanceChange>) -> Self {
        self.balance_changes = changes;
        self
    }

    pub fn nested_under(mut self, parent_index: u32, depth: u32) -> Self {
        self.parent_index = Some(parent_index);
        self.depth = depth;
        self
    }
}

/// A single program log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogEntry {
    pub message: String,
    pub ordinal: u64,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, ordinal: u64) -> Self {
        Self {
            message: message.into(),
            ordinal,
        }
    }
}

// =============================================================================
// CLUSTER C: STATE DELTAS
// =============================================================================

/// Account data change recorded during an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccountChange {
    pub pubkey: String,
    pub prev_data: Vec<u8>,
    pub new_data: Vec<u8>,
    pub new_data_length: u64,
}

/// Lamport balance change recorded during an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BalanceChange {
    pub pubkey: String,
    pub prev_lamports: u64,
    pub new_lamports: u64,
}
