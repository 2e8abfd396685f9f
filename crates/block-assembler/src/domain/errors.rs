//! Error types for the Block Assembler
//!
//! Every fatal error carries either the offending raw line or the height it
//! concerns, plus the underlying cause.

use thiserror::Error;

/// Result type alias for assembler operations
pub type Result<T> = std::result::Result<T, AssemblerError>;

/// All fatal errors surfaced by the reader.
///
/// None of these are retried internally; the embedding application decides
/// whether to restart the stream from a checkpoint.
#[derive(Debug, Error)]
pub enum AssemblerError {
    /// Malformed or out-of-sequence event
    #[error("Protocol error on line {line:?}: {violation}")]
    Protocol {
        line: String,
        violation: ProtocolViolation,
    },

    /// A parallel-group artifact failed to open or deserialize
    #[error("Decode error for block {height}: {source}")]
    Decode {
        height: u64,
        #[source]
        source: DecodeError,
    },

    /// Decoded transaction count disagrees with the canonical order vector
    #[error("Assembly mismatch for block {height}: decoded {decoded} transactions, canonical order has {expected}")]
    AssemblyMismatch {
        height: u64,
        decoded: usize,
        expected: usize,
    },

    /// Invalid configuration for the negotiated session
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The node reported the block as failed
    #[error("Block {height} failed: {reason}")]
    AssemblyFailed { height: u64, reason: String },

    /// The consumer dropped the output queue
    #[error("Output queue closed while emitting block {height}")]
    OutputClosed { height: u64 },

    /// Upstream byte source failure
    #[error("I/O error reading instrumentation stream: {0}")]
    Io(#[from] std::io::Error),
}

impl AssemblerError {
    pub(crate) fn protocol(line: &str, violation: ProtocolViolation) -> Self {
        Self::Protocol {
            line: line.to_string(),
            violation,
        }
    }

    /// Height the error concerns, when it is tied to one block.
    pub fn height(&self) -> Option<u64> {
        match self {
            Self::Decode { height, .. }
            | Self::AssemblyMismatch { height, .. }
            | Self::AssemblyFailed { height, .. }
            | Self::OutputClosed { height } => Some(*height),
            Self::Protocol { violation, .. } => violation.height(),
            Self::Configuration(_) | Self::Io(_) => None,
        }
    }

    /// Check if the error is a stream-level protocol violation
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}

/// Why an instrumentation line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("event received before session handshake")]
    MissingHandshake,

    #[error("session handshake already established")]
    DuplicateHandshake,

    #[error("unsupported variant {0:?}, expected one of: minimal, detailed")]
    UnsupportedVariant(String),

    #[error("{event} expects {expected} fields, got {actual}")]
    FieldCount {
        event: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("field {field} is not an unsigned integer: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid work kind {0:?}, expected full or partial")]
    InvalidWorkKind(String),

    #[error("unknown event {0:?}")]
    UnknownEvent(String),

    #[error("no active assembly for block {height}")]
    NoActiveAssembly { height: u64 },

    #[error("event for block {received} while block {active} is active")]
    HeightMismatch { active: u64, received: u64 },

    #[error("group produced outside of any assembly")]
    GroupOutsideAssembly,

    #[error("block {height} cannot accept {event} while {state}")]
    InvalidTransition {
        height: u64,
        state: String,
        event: &'static str,
    },
}

impl ProtocolViolation {
    fn height(&self) -> Option<u64> {
        match self {
            Self::NoActiveAssembly { height } => Some(*height),
            Self::HeightMismatch { received, .. } => Some(*received),
            Self::InvalidTransition { height, .. } => Some(*height),
            _ => None,
        }
    }
}

/// Failure while decoding one group file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("cannot read group file {file}: {message}")]
    Io { file: String, message: String },

    #[error("malformed group file {file} at frame {frame}: {message}")]
    Malformed {
        file: String,
        frame: usize,
        message: String,
    },

    #[error("decoded transaction {id} is not part of the canonical order")]
    UnknownTransaction { id: String },

    #[error("ordinals of transaction {id} overflow the block-wide range")]
    OrdinalOverflow { id: String },

    #[error("decode task aborted: {0}")]
    TaskFailed(String),
}
