//! Narrow asynchronous contracts to persistent state and collaborators
//!
//! The pipeline never talks to Postgres or the message broker directly;
//! every store access and outbound publish goes through one of these
//! traits. Production wiring binds them to the `db` implementations and a
//! broker-backed publisher; tests bind the in-memory versions in
//! [`memory`].

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::flow_control::RawRecordsFlowControl;
use crate::engine::mapping_cache::MappingMetadataCache;
use crate::models::profile::ProfileSnapshot;
use crate::models::{
    ChunkState, JobExecution, JobExecutionProgress, JobExecutionSourceChunk, JournalRecord,
};

/// Error raised by any store or collaborator implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed row does not exist (or is soft-deleted)
    #[error("{0}")]
    NotFound(String),

    /// The backing store rejected or failed the operation
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{resource} '{id}' not found"))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Aggregate chunk bookkeeping for one job, used for completion detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkCompletionState {
    /// A chunk with last=true has been received
    pub has_last: bool,
    /// At least one chunk is still IN_PROGRESS
    pub any_in_progress: bool,
    /// At least one chunk ended in ERROR
    pub any_error: bool,
    /// Records received across every chunk so far
    pub received_records: i64,
    /// Running counter carried by the last-flagged chunk, when received
    pub last_counter: Option<i64>,
}

impl ChunkCompletionState {
    /// Processing is finished only when the last chunk arrived, no chunk
    /// is still in flight, and every record up to the last chunk's running
    /// counter has been received, regardless of arrival order
    pub fn is_processing_finished(&self) -> bool {
        self.has_last
            && !self.any_in_progress
            && self
                .last_counter
                .is_some_and(|counter| self.received_records >= counter)
    }
}

/// Persistent record of jobs and their status/progress
#[async_trait]
pub trait JobExecutionStore: Send + Sync {
    async fn save(&self, job: &JobExecution) -> StoreResult<()>;

    /// Fetch a job by id; soft-deleted jobs are reported as absent
    async fn get(&self, id: Uuid) -> StoreResult<Option<JobExecution>>;

    /// Persist the full current state of a job; NotFound when absent/deleted
    async fn update(&self, job: &JobExecution) -> StoreResult<()>;

    /// Allocate `count` sequential human-readable ids
    async fn next_hr_ids(&self, count: usize) -> StoreResult<Vec<i32>>;

    /// CHILD jobs of a parent, paginated, with the unpaginated total
    async fn children(
        &self,
        parent_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<JobExecution>, i64)>;

    /// Soft-delete jobs by id; returns a per-id deleted flag
    async fn soft_delete(&self, ids: &[Uuid]) -> StoreResult<Vec<(Uuid, bool)>>;
}

/// Chunk bookkeeping for the pipeline
#[async_trait]
pub trait SourceChunkStore: Send + Sync {
    async fn save(&self, chunk: &JobExecutionSourceChunk) -> StoreResult<()>;

    /// Transition a chunk out of IN_PROGRESS; chunks are immutable afterward
    async fn complete(
        &self,
        chunk_id: Uuid,
        state: ChunkState,
        completed_date: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Completion bookkeeping over every chunk received so far for the job
    async fn completion_state(&self, job_execution_id: Uuid) -> StoreResult<ChunkCompletionState>;
}

/// Append-only journal of per-entity processing outcomes
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn save_batch(&self, records: &[JournalRecord]) -> StoreResult<()>;

    async fn by_job(&self, job_execution_id: Uuid) -> StoreResult<Vec<JournalRecord>>;

    async fn by_job_and_source(
        &self,
        job_execution_id: Uuid,
        source_id: Uuid,
    ) -> StoreResult<Vec<JournalRecord>>;
}

/// Per-job progress counters for completion detection
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Record the expected total once; later calls with a different total
    /// are ignored (first chunk wins)
    async fn initialize(&self, job_execution_id: Uuid, expected_total: i32) -> StoreResult<()>;

    async fn increment(
        &self,
        job_execution_id: Uuid,
        succeeded_delta: i32,
        failed_delta: i32,
    ) -> StoreResult<JobExecutionProgress>;

    async fn get(&self, job_execution_id: Uuid) -> StoreResult<Option<JobExecutionProgress>>;
}

/// Heartbeat store consumed by an external stall watchdog
#[async_trait]
pub trait MonitoringStore: Send + Sync {
    async fn touch(&self, job_execution_id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}

/// External profile service: resolves a profile id into a frozen snapshot
#[async_trait]
pub trait ProfileSnapshotClient: Send + Sync {
    async fn resolve(&self, job_profile_id: Uuid) -> StoreResult<ProfileSnapshot>;
}

/// Upstream source-record snapshot state, deleted on job cancellation
#[async_trait]
pub trait SnapshotClient: Send + Sync {
    /// Delete the snapshot for a job; absence of the snapshot is not an
    /// error, only backend failures are
    async fn delete(&self, job_execution_id: Uuid) -> StoreResult<()>;
}

/// Outbound channel for classified/errored record events
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    async fn publish(&self, event: crate::engine::events::RecordEvent) -> StoreResult<()>;
}

/// External mapping-rules service; results are cached per job by
/// [`MappingMetadataCache`]
#[async_trait]
pub trait MappingMetadataProvider: Send + Sync {
    /// Mapping rules for a record content type, as an opaque document
    async fn mapping_rules(&self, record_type: &str) -> StoreResult<serde_json::Value>;

    /// Mapping parameters shared by every rule of a tenant
    async fn mapping_parameters(&self, tenant_id: &str) -> StoreResult<serde_json::Value>;
}

/// Shared handles passed to every command and query handler
#[derive(Clone)]
pub struct AppContext {
    pub job_executions: Arc<dyn JobExecutionStore>,
    pub chunks: Arc<dyn SourceChunkStore>,
    pub journal: Arc<dyn JournalStore>,
    pub progress: Arc<dyn ProgressStore>,
    pub monitoring: Arc<dyn MonitoringStore>,
    pub profile_snapshots: Arc<dyn ProfileSnapshotClient>,
    pub snapshots: Arc<dyn SnapshotClient>,
    pub publisher: Arc<dyn RecordPublisher>,
    pub mapping_metadata: Arc<MappingMetadataCache>,
    pub flow_control: Arc<RawRecordsFlowControl>,
}
