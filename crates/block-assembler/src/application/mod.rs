//! Application layer: assembly lifecycle, dispatch and the read loop

pub mod assembly;
pub mod decoder;
pub mod dispatcher;
pub mod reader;
pub mod registry;

pub use assembly::BlockAssembly;
pub use decoder::{DecodeTaskGroup, GroupAccumulator, GroupDecoder};
pub use dispatcher::{Dispatcher, ReaderStats};
pub use reader::{spawn_block_stream, ConsoleReader};
pub use registry::AssemblyRegistry;
