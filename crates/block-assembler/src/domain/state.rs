//! Block assembly lifecycle
//!
//! An assembly absent from the registry is `Empty`; once opened it moves
//! through the states below.
//!
//! ```text
//! Working ──BATCHES_END──→ GroupsPending ──BLOCK_END──→ Finalizing ──→ Done
//!    ↑                          │
//!    └───────BLOCK_WORK─────────┘            (any) ──BLOCK_FAILED──→ Failed
//! ```

use std::fmt;
use std::str::FromStr;

/// Whether a `BLOCK_WORK` report covers the full block or a slice of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    Full,
    Partial,
}

impl FromStr for WorkKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "partial" => Ok(Self::Partial),
            _ => Err(()),
        }
    }
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// Lifecycle state of one block assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Working,
    GroupsPending,
    Finalizing,
    Done,
    Failed,
}

impl AssemblyState {
    /// Group decodes may only be submitted while work is still being reported
    pub fn accepts_groups(self) -> bool {
        matches!(self, Self::Working | Self::GroupsPending)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Next state after `event`, or `None` when the transition is not allowed.
    pub fn on(self, event: Transition) -> Option<Self> {
        use Transition::*;
        match (self, event) {
            (Self::Working | Self::GroupsPending, Begin) => Some(Self::Working),
            (Self::Working | Self::GroupsPending, GroupsComplete) => Some(Self::GroupsPending),
            (Self::Working | Self::GroupsPending, End) => Some(Self::Finalizing),
            (Self::Finalizing, Finalized) => Some(Self::Done),
            (state, Fail) if !state.is_terminal() => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Lifecycle inputs driving [`AssemblyState::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Begin,
    GroupsComplete,
    End,
    Finalized,
    Fail,
}
