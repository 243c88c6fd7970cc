//! Chunk ingestion feature
//!
//! Receives batches of raw records for a job, drives them through the
//! change engine, and detects job completion across out-of-order chunks.

pub mod commands;
pub mod routes;

pub use routes::chunks_routes;
