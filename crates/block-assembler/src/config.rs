//! Configuration for the Block Assembler

use crate::domain::errors::{AssemblerError, Result};
use crate::domain::redaction::RedactionPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default decode concurrency ceiling per assembly
pub const DEFAULT_DECODE_CONCURRENCY: usize = 200;

/// Default number of finalized blocks buffered for the consumer
pub const DEFAULT_OUTPUT_QUEUE_CAPACITY: usize = 10;

/// Default bound on in-flight assemblies
pub const DEFAULT_MAX_PENDING_ASSEMBLIES: usize = 64;

/// Reader configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Directory holding group files; required by the detailed variant
    pub group_dir: Option<PathBuf>,
    /// Keep group files after decoding instead of deleting them
    pub keep_group_files: bool,
    /// Maximum concurrent group decodes per assembly
    pub decode_concurrency: usize,
    /// Finalized blocks buffered before finalization applies backpressure
    pub output_queue_capacity: usize,
    /// In-flight assemblies kept before the oldest idle ones are evicted
    pub max_pending_assemblies: usize,
    /// Account-change redaction applied while decoding
    pub redaction: RedactionPolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            group_dir: None,
            keep_group_files: false,
            decode_concurrency: DEFAULT_DECODE_CONCURRENCY,
            output_queue_capacity: DEFAULT_OUTPUT_QUEUE_CAPACITY,
            max_pending_assemblies: DEFAULT_MAX_PENDING_ASSEMBLIES,
            redaction: RedactionPolicy::default(),
        }
    }
}

impl ReaderConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FIRE_GROUP_DIR`: Group file directory (default: unset)
    /// - `FIRE_KEEP_GROUP_FILES`: Keep decoded group files (default: false)
    /// - `FIRE_DECODE_CONCURRENCY`: Decode ceiling per assembly (default: 200)
    /// - `FIRE_OUTPUT_QUEUE_CAPACITY`: Output queue capacity (default: 10)
    /// - `FIRE_MAX_PENDING_ASSEMBLIES`: In-flight assembly bound (default: 64)
    /// - `FIRE_STRIP_ACCOUNT_CHANGES`: Strip every account change (default: false)
    /// - `FIRE_ACCOUNT_CHANGE_BLACKLIST`: Comma-separated program ids
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            group_dir: env::var("FIRE_GROUP_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),

            keep_group_files: env_flag("FIRE_KEEP_GROUP_FILES"),

            decode_concurrency: env_usize("FIRE_DECODE_CONCURRENCY")
                .unwrap_or(defaults.decode_concurrency),

            output_queue_capacity: env_usize("FIRE_OUTPUT_QUEUE_CAPACITY")
                .unwrap_or(defaults.output_queue_capacity),

            max_pending_assemblies: env_usize("FIRE_MAX_PENDING_ASSEMBLIES")
                .unwrap_or(defaults.max_pending_assemblies),

            redaction: RedactionPolicy {
                strip_all_account_changes: env_flag("FIRE_STRIP_ACCOUNT_CHANGES"),
                account_change_blacklist: env::var("FIRE_ACCOUNT_CHANGE_BLACKLIST")
                    .map(|v| parse_list(&v))
                    .unwrap_or_default()
                    .into_iter()
                    .collect(),
            },
        }
    }

    pub fn with_group_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.group_dir = Some(dir.into());
        self
    }

    pub fn with_redaction(mut self, redaction: RedactionPolicy) -> Self {
        self.redaction = redaction;
        self
    }

    /// Reject limits that would stall the reader
    pub fn validate(&self) -> Result<()> {
        if self.decode_concurrency == 0 {
            return Err(AssemblerError::Configuration(
                "decode_concurrency must be at least 1".to_string(),
            ));
        }
        if self.output_queue_capacity == 0 {
            return Err(AssemblerError::Configuration(
                "output_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_pending_assemblies == 0 {
            return Err(AssemblerError::Configuration(
                "max_pending_assemblies must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_usize(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
