//! Domain module for the Block Assembler
//!
//! Pure logic: event grammar, session negotiation, assembly lifecycle,
//! canonical ordering, ordinal assignment, redaction and invariants.

pub mod canonical;
pub mod errors;
pub mod events;
pub mod invariants;
pub mod ordinals;
pub mod redaction;
pub mod root;
pub mod session;
pub mod state;

pub use canonical::CanonicalOrder;
pub use errors::*;
pub use events::{AssemblyBegin, AssemblyEnd, Event, EventKind, MARKER};
pub use ordinals::assign_ordinals;
pub use redaction::RedactionPolicy;
pub use root::RootTracker;
pub use session::{Session, SessionNegotiator, Variant};
pub use state::{AssemblyState, Transition, WorkKind};
