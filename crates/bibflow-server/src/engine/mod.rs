//! The change engine and its supporting machinery
//!
//! Everything that happens to a raw record between chunk receipt and
//! outbound emission lives here: MARC parsing and classification, the
//! duplicate-creation guard, flow control over ingestion, the per-job
//! mapping-metadata cache, and the outbound event types.

pub mod change_engine;
pub mod events;
pub mod flow_control;
pub mod mapping_cache;
pub mod marc;

pub use change_engine::{ChangeEngine, ChangeEngineError, ChunkOutcome};
pub use flow_control::{FlowControlSettings, PausableConsumer, RawRecordsFlowControl};
