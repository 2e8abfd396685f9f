//! Inbound Ports (Driving Ports / API)

use crate::domain::errors::Result;
use async_trait::async_trait;
use shared_types::Block;

/// Pull-based source of finalized blocks
#[async_trait]
pub trait BlockSource: Send {
    /// Next finalized block in increasing height order.
    ///
    /// `Ok(None)` signals end-of-stream (input exhausted or cancelled); an
    /// error is fatal and no further blocks are produced.
    async fn next_block(&mut self) -> Result<Option<Block>>;
}
