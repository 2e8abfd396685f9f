//! Instrumentation events
//!
//! Every instrumentation line is decoded once, at dispatch time, into a
//! closed [`Event`] enum. Each kind validates its exact field arity.
//!
//! ```text
//! FIRE INIT <format_version> <variant> <node_version>
//! FIRE BLOCK_WORK <parent_height> <height> <full|partial> <parent_id> <id;id;...>
//! FIRE BATCH_FILE <file_name>
//! FIRE BATCHES_END
//! FIRE BLOCK_END <height> <block_id> <parent_id> <genesis_unix_ts> <clock_unix_ts>
//! FIRE BLOCK_FAILED <height> <reason...>
//! FIRE BLOCK_ROOT <height>
//! ```

use super::errors::ProtocolViolation;
use super::state::WorkKind;

/// Marker prefix carried by every instrumentation line
pub const MARKER: &str = "FIRE";

/// Event keywords in dispatch priority order (most frequent first).
pub const DISPATCH_ORDER: [EventKind; 7] = [
    EventKind::GroupProduced,
    EventKind::AssemblyBegin,
    EventKind::GroupsComplete,
    EventKind::AssemblyEnd,
    EventKind::RootAdvanced,
    EventKind::AssemblyFailed,
    EventKind::SessionHandshake,
];

/// Event discriminant, keyed by its wire keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionHandshake,
    AssemblyBegin,
    GroupProduced,
    GroupsComplete,
    AssemblyEnd,
    AssemblyFailed,
    RootAdvanced,
}

impl EventKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::SessionHandshake => "INIT",
            Self::AssemblyBegin => "BLOCK_WORK",
            Self::GroupProduced => "BATCH_FILE",
            Self::GroupsComplete => "BATCHES_END",
            Self::AssemblyEnd => "BLOCK_END",
            Self::AssemblyFailed => "BLOCK_FAILED",
            Self::RootAdvanced => "BLOCK_ROOT",
        }
    }

    /// Kinds that only make sense when the node traces execution in detail
    pub fn is_detailed_only(self) -> bool {
        matches!(self, Self::GroupProduced | Self::GroupsComplete)
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        DISPATCH_ORDER
            .iter()
            .copied()
            .find(|kind| kind.keyword() == keyword)
    }
}

/// Opening (or re-opening) of a block assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyBegin {
    pub parent_height: u64,
    pub height: u64,
    pub work_kind: WorkKind,
    pub parent_id: String,
    /// Canonical transaction order reported for this unit of work
    pub transaction_ids: Vec<String>,
}

/// Closing of a block assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyEnd {
    pub height: u64,
    pub block_id: String,
    pub parent_id: String,
    pub genesis_unix_timestamp: u64,
    pub clock_unix_timestamp: u64,
}

/// A parsed instrumentation line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SessionHandshake {
        format_version: u64,
        variant: String,
        node_version: String,
    },
    AssemblyBegin(AssemblyBegin),
    GroupProduced { file_name: String },
    GroupsComplete,
    AssemblyEnd(AssemblyEnd),
    AssemblyFailed { height: u64, reason: String },
    RootAdvanced { height: u64 },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SessionHandshake { .. } => EventKind::SessionHandshake,
            Self::AssemblyBegin(_) => EventKind::AssemblyBegin,
            Self::GroupProduced { .. } => EventKind::GroupProduced,
            Self::GroupsComplete => EventKind::GroupsComplete,
            Self::AssemblyEnd(_) => EventKind::AssemblyEnd,
            Self::AssemblyFailed { .. } => EventKind::AssemblyFailed,
            Self::RootAdvanced { .. } => EventKind::RootAdvanced,
        }
    }

    /// Decode one instrumentation line (marker included).
    ///
    /// Lines whose keyword is not recognized yield
    /// [`ProtocolViolation::UnknownEvent`]; whether that is fatal is decided by
    /// the caller according to the negotiated variant.
    pub fn parse(line: &str) -> Result<Self, ProtocolViolation> {
        let body = line
            .strip_prefix(MARKER)
            .and_then(|rest| rest.strip_prefix(' '))
            .ok_or_else(|| ProtocolViolation::UnknownEvent(line.to_string()))?;

        let (keyword, fields) = match body.split_once(' ') {
            Some((keyword, rest)) => (keyword, rest.split(' ').collect::<Vec<_>>()),
            None => (body, Vec::new()),
        };

        let kind = EventKind::from_keyword(keyword)
            .ok_or_else(|| ProtocolViolation::UnknownEvent(keyword.to_string()))?;

        match kind {
            EventKind::SessionHandshake => parse_handshake(&fields),
            EventKind::AssemblyBegin => parse_assembly_begin(&fields),
            EventKind::GroupProduced => {
                expect_fields(kind, &fields, 1)?;
                Ok(Self::GroupProduced {
                    file_name: fields[0].to_string(),
                })
            }
            EventKind::GroupsComplete => {
                expect_fields(kind, &fields, 0)?;
                Ok(Self::GroupsComplete)
            }
            EventKind::AssemblyEnd => parse_assembly_end(&fields),
            EventKind::AssemblyFailed => parse_assembly_failed(&fields),
            EventKind::RootAdvanced => {
                expect_fields(kind, &fields, 1)?;
                Ok(Self::RootAdvanced {
                    height: parse_u64("height", fields[0])?,
                })
            }
        }
    }
}

fn expect_fields(kind: EventKind, fields: &[&str], expected: usize) -> Result<(), ProtocolViolation> {
    if fields.len() != expected {
        return Err(ProtocolViolation::FieldCount {
            event: kind.keyword(),
            expected,
            actual: fields.len(),
        });
    }
    Ok(())
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ProtocolViolation> {
    value
        .parse::<u64>()
        .map_err(|_| ProtocolViolation::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_handshake(fields: &[&str]) -> Result<Event, ProtocolViolation> {
    expect_fields(EventKind::SessionHandshake, fields, 3)?;
    Ok(Event::SessionHandshake {
        format_version: parse_u64("format_version", fields[0])?,
        variant: fields[1].to_string(),
        node_version: fields[2].to_string(),
    })
}

fn parse_assembly_begin(fields: &[&str]) -> Result<Event, ProtocolViolation> {
    expect_fields(EventKind::AssemblyBegin, fields, 5)?;
    let work_kind = fields[2]
        .parse::<WorkKind>()
        .map_err(|_| ProtocolViolation::InvalidWorkKind(fields[2].to_string()))?;

    Ok(Event::AssemblyBegin(AssemblyBegin {
        parent_height: parse_u64("parent_height", fields[0])?,
        height: parse_u64("height", fields[1])?,
        work_kind,
        parent_id: fields[3].to_string(),
        transaction_ids: fields[4]
            .split(';')
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect(),
    }))
}

fn parse_assembly_end(fields: &[&str]) -> Result<Event, ProtocolViolation> {
    expect_fields(EventKind::AssemblyEnd, fields, 5)?;
    Ok(Event::AssemblyEnd(AssemblyEnd {
        height: parse_u64("height", fields[0])?,
        block_id: fields[1].to_string(),
        parent_id: fields[2].to_string(),
        genesis_unix_timestamp: parse_u64("genesis_unix_timestamp", fields[3])?,
        clock_unix_timestamp: parse_u64("clock_unix_timestamp", fields[4])?,
    }))
}

fn parse_assembly_failed(fields: &[&str]) -> Result<Event, ProtocolViolation> {
    if fields.len() < 2 {
        return Err(ProtocolViolation::FieldCount {
            event: EventKind::AssemblyFailed.keyword(),
            expected: 2,
            actual: fields.len(),
        });
    }
    Ok(Event::AssemblyFailed {
        height: parse_u64("height", fields[0])?,
        reason: fields[1..].join(" "),
    })
}
