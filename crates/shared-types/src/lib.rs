//! # Shared Types Crate
//!
//! This crate contains the block entities produced by the Block Assembler
//! and consumed by the runtime and any embedding application.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Output entities are defined here only.
//! - **Serialization Agnostic**: Entities derive serde; the side-artifact
//!   codec (bincode) and the runtime output (JSON) both reuse them.

pub mod entities;

pub use entities::*;
