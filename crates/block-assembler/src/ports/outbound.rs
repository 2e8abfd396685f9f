//! Outbound Ports (Driven Ports / SPI)

use crate::domain::errors::DecodeError;
use async_trait::async_trait;

/// Storage holding the parallel-group side artifacts written by the node
#[async_trait]
pub trait GroupFileStore: Send + Sync {
    /// Read the full content of a group file.
    async fn read(&self, file_name: &str) -> Result<Vec<u8>, DecodeError>;

    /// Delete a group file once it has been decoded.
    async fn remove(&self, file_name: &str) -> Result<(), DecodeError>;
}
