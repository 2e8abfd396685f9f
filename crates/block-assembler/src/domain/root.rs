//! Root tracker
//!
//! Remembers the latest irreversible height reported by `BLOCK_ROOT` and
//! stamps it on blocks finalized afterwards.

use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct RootTracker {
    last_irreversible_height: u64,
}

impl RootTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reported root. Updates unconditionally, even when the node
    /// reports a lower height than before.
    pub fn advance(&mut self, height: u64) {
        if height < self.last_irreversible_height {
            debug!(
                previous = self.last_irreversible_height,
                reported = height,
                "[fire] Root moved backwards"
            );
        }
        self.last_irreversible_height = height;
    }

    /// Zero until the first root is reported
    pub fn current(&self) -> u64 {
        self.last_irreversible_height
    }
}
