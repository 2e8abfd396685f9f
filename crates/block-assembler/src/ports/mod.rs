//! Ports (hexagonal boundaries)

pub mod inbound;
pub mod outbound;

pub use inbound::BlockSource;
pub use outbound::GroupFileStore;
