//! Account-change redaction
//!
//! Fine-grained account data changes are large; operators may strip them
//! globally or for a blacklist of programs. Balance changes and logs are
//! always kept.

use serde::{Deserialize, Serialize};
use shared_types::Transaction;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionPolicy {
    /// Strip account changes from every instruction
    pub strip_all_account_changes: bool,
    /// Program ids whose instructions lose their account changes
    pub account_change_blacklist: HashSet<String>,
}

impl RedactionPolicy {
    pub fn strip_all() -> Self {
        Self {
            strip_all_account_changes: true,
            ..Default::default()
        }
    }

    pub fn with_blacklist<I, S>(programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            strip_all_account_changes: false,
            account_change_blacklist: programs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_noop(&self) -> bool {
        !self.strip_all_account_changes && self.account_change_blacklist.is_empty()
    }

    /// Apply the policy to one transaction in place.
    ///
    /// Returns the number of account changes removed.
    pub fn apply(&self, trx: &mut Transaction) -> usize {
        if self.is_noop() {
            return 0;
        }

        let mut removed = 0;
        for instruction in trx.instructions.iter_mut() {
            if self.strip_all_account_changes
                || self.account_change_blacklist.contains(&instruction.program_id)
            {
                removed += instruction.account_changes.len();
                instruction.account_changes.clear();
            }
        }
        removed
    }
}
