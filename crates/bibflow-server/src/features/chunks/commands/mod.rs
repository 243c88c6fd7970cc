//! Write operations of the chunk pipeline

pub mod process_chunk;

pub use process_chunk::ProcessChunkCommand;
