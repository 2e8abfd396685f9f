//! Session negotiation
//!
//! The stream opens with exactly one `INIT` handshake that fixes the format
//! version and the tracing variant for the rest of the stream.

use super::errors::ProtocolViolation;
use std::fmt;
use std::str::FromStr;

/// Instrumentation detail level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Only block lifecycle and transaction ids are reported
    Minimal,
    /// Execution traces are reported through parallel-group side artifacts
    Detailed,
}

impl FromStr for Variant {
    type Err = ProtocolViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "detailed" => Ok(Self::Detailed),
            other => Err(ProtocolViolation::UnsupportedVariant(other.to_string())),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::Detailed => write!(f, "detailed"),
        }
    }
}

/// Established session; immutable once negotiated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub format_version: u64,
    pub variant: Variant,
    pub node_version: String,
}

/// Holds the single session of a stream
#[derive(Debug, Default)]
pub struct SessionNegotiator {
    session: Option<Session>,
}

impl SessionNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish the session from the handshake fields.
    ///
    /// Fails on a second handshake or on an unsupported variant. Checking the
    /// side-artifact configuration is left to the caller, which owns it.
    pub fn establish(
        &mut self,
        format_version: u64,
        variant: &str,
        node_version: &str,
    ) -> Result<&Session, ProtocolViolation> {
        if self.session.is_some() {
            return Err(ProtocolViolation::DuplicateHandshake);
        }

        let variant = variant.parse::<Variant>()?;
        Ok(self.session.insert(Session {
            format_version,
            variant,
            node_version: node_version.to_string(),
        }))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn variant(&self) -> Option<Variant> {
        self.session.as_ref().map(|s| s.variant)
    }

    pub fn is_established(&self) -> bool {
        self.session.is_some()
    }
}
