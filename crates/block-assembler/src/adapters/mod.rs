//! Adapters (port implementations and I/O edges)

pub mod group_file;
pub mod scanner;

pub use group_file::{decode_group_file, encode_group_file, FsGroupFileStore};
pub use scanner::LineScanner;
