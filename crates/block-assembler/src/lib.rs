//! # Block Assembler
//!
//! Reconstructs finalized blocks from the instrumentation log a validator
//! writes to its console. The node interleaves `FIRE`-prefixed lifecycle
//! events with ordinary output and writes parallel execution groups to side
//! files; the assembler puts them back together in canonical order.
//!
//! ## Data Flow
//!
//! ```text
//! stdin / file ──→ LineScanner ──→ Dispatcher ──→ AssemblyRegistry
//!                                      │               │
//!                                      │        BlockAssembly (per height)
//!                                      │               │ BATCH_FILE
//!                                      │               ↓
//!                                      │        DecodeTaskGroup ──→ GroupFileStore
//!                                      ↓ BLOCK_END
//!                         finalize: wait, arrange, ordinals, root
//!                                      ↓
//!                              Output queue ──→ ConsoleReader::next_block
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Canonical Order | Transactions follow the `BLOCK_WORK` id vector, whatever the group arrival order |
//! | 2 | Monotonic Ordinals | Ordinals strictly increase across the block |
//! | 3 | Nesting | Instruction and log ordinals stay inside their transaction span |
//! | 4 | Single Session | Exactly one `INIT` per stream |
//! | 5 | No Partial Blocks | Failed, mismatched or cancelled assemblies emit nothing |
//! | 6 | Bounded Registry | At most `max_pending_assemblies` in flight |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Event grammar, session, lifecycle, ordering and ordinals
//! - `ports/` - `BlockSource` (inbound) and `GroupFileStore` (outbound)
//! - `adapters/` - Line scanner, group file codec and filesystem store
//! - `application/` - Decoder, assembly, registry, dispatcher and reader
//! - `config.rs` - Reader configuration
//!
//! ## Usage
//!
//! ```ignore
//! use block_assembler::{ConsoleReader, ReaderConfig};
//!
//! let config = ReaderConfig::from_env();
//! let mut reader = ConsoleReader::new(tokio::io::BufReader::new(tokio::io::stdin()), config)?;
//!
//! while let Some(block) = reader.next_block().await? {
//!     println!("{} {}", block.height, block.transaction_count());
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-export key types for convenience
pub use adapters::{decode_group_file, encode_group_file, FsGroupFileStore, LineScanner};
pub use application::{spawn_block_stream, ConsoleReader, ReaderStats};
pub use config::ReaderConfig;
pub use domain::errors::{AssemblerError, DecodeError, ProtocolViolation, Result};
pub use domain::{RedactionPolicy, Variant, WorkKind};
pub use ports::{BlockSource, GroupFileStore};

pub use shared_types::{Block, Transaction};
