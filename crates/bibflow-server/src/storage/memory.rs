//! In-memory implementations of the storage contracts
//!
//! Back the unit and property tests, and the server's standalone mode
//! (no DATABASE_URL). Every implementation keeps its state behind a
//! plain mutex; none of the lock sections await.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::engine::events::RecordEvent;
use crate::engine::flow_control::{FlowControlSettings, RawRecordsFlowControl};
use crate::engine::mapping_cache::MappingMetadataCache;
use crate::models::profile::ProfileSnapshot;
use crate::models::{
    ChunkState, JobExecution, JobExecutionProgress, JobExecutionSourceChunk, JobMonitoring,
    JournalRecord,
};
use crate::storage::{
    AppContext, ChunkCompletionState, JobExecutionStore, JournalStore, MappingMetadataProvider,
    MonitoringStore, ProfileSnapshotClient, ProgressStore, RecordPublisher, SnapshotClient,
    SourceChunkStore, StoreError, StoreResult,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// Job executions
// ============================================================================

#[derive(Default)]
pub struct InMemoryJobExecutionStore {
    jobs: Mutex<HashMap<Uuid, JobExecution>>,
    hr_id_sequence: AtomicI32,
}

impl InMemoryJobExecutionStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            hr_id_sequence: AtomicI32::new(1),
        }
    }

    /// Direct read including soft-deleted rows, for assertions in tests
    pub fn raw_get(&self, id: Uuid) -> Option<JobExecution> {
        lock(&self.jobs).get(&id).cloned()
    }
}

#[async_trait]
impl JobExecutionStore for InMemoryJobExecutionStore {
    async fn save(&self, job: &JobExecution) -> StoreResult<()> {
        lock(&self.jobs).insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<JobExecution>> {
        Ok(lock(&self.jobs).get(&id).filter(|j| !j.deleted).cloned())
    }

    async fn update(&self, job: &JobExecution) -> StoreResult<()> {
        let mut jobs = lock(&self.jobs);
        match jobs.get(&job.id) {
            Some(existing) if !existing.deleted => {
                jobs.insert(job.id, job.clone());
                Ok(())
            },
            _ => Err(StoreError::not_found("JobExecution", job.id)),
        }
    }

    async fn next_hr_ids(&self, count: usize) -> StoreResult<Vec<i32>> {
        let start = self.hr_id_sequence.fetch_add(count as i32, Ordering::SeqCst);
        Ok((start..start + count as i32).collect())
    }

    async fn children(
        &self,
        parent_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<JobExecution>, i64)> {
        let jobs = lock(&self.jobs);
        let mut children: Vec<JobExecution> = jobs
            .values()
            .filter(|j| {
                !j.deleted
                    && j.parent_job_id == parent_id
                    && j.id != parent_id
            })
            .cloned()
            .collect();
        children.sort_by_key(|j| j.hr_id);
        let total = children.len() as i64;
        let page = children
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn soft_delete(&self, ids: &[Uuid]) -> StoreResult<Vec<(Uuid, bool)>> {
        let mut jobs = lock(&self.jobs);
        Ok(ids
            .iter()
            .map(|id| match jobs.get_mut(id) {
                Some(job) if !job.deleted => {
                    job.deleted = true;
                    (*id, true)
                },
                _ => (*id, false),
            })
            .collect())
    }
}

// ============================================================================
// Source chunks
// ============================================================================

#[derive(Default)]
pub struct InMemorySourceChunkStore {
    chunks: Mutex<HashMap<Uuid, JobExecutionSourceChunk>>,
}

impl InMemorySourceChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceChunkStore for InMemorySourceChunkStore {
    async fn save(&self, chunk: &JobExecutionSourceChunk) -> StoreResult<()> {
        lock(&self.chunks).insert(chunk.id, chunk.clone());
        Ok(())
    }

    async fn complete(
        &self,
        chunk_id: Uuid,
        state: ChunkState,
        completed_date: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut chunks = lock(&self.chunks);
        let chunk = chunks
            .get_mut(&chunk_id)
            .ok_or_else(|| StoreError::not_found("JobExecutionSourceChunk", chunk_id))?;
        chunk.state = state;
        chunk.completed_date = Some(completed_date);
        Ok(())
    }

    async fn completion_state(&self, job_execution_id: Uuid) -> StoreResult<ChunkCompletionState> {
        let chunks = lock(&self.chunks);
        let mut state = ChunkCompletionState::default();
        for chunk in chunks.values().filter(|c| c.job_execution_id == job_execution_id) {
            state.has_last |= chunk.last;
            state.any_in_progress |= chunk.state == ChunkState::InProgress;
            state.any_error |= chunk.state == ChunkState::Error;
            state.received_records += chunk.chunk_size as i64;
            if chunk.last {
                state.last_counter = Some(
                    state
                        .last_counter
                        .map_or(chunk.records_counter as i64, |c| {
                            c.max(chunk.records_counter as i64)
                        }),
                );
            }
        }
        Ok(state)
    }
}

// ============================================================================
// Journal
// ============================================================================

#[derive(Default)]
pub struct InMemoryJournalStore {
    records: Mutex<Vec<JournalRecord>>,
}

impl InMemoryJournalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JournalStore for InMemoryJournalStore {
    async fn save_batch(&self, records: &[JournalRecord]) -> StoreResult<()> {
        lock(&self.records).extend_from_slice(records);
        Ok(())
    }

    async fn by_job(&self, job_execution_id: Uuid) -> StoreResult<Vec<JournalRecord>> {
        Ok(lock(&self.records)
            .iter()
            .filter(|r| r.job_execution_id == job_execution_id)
            .cloned()
            .collect())
    }

    async fn by_job_and_source(
        &self,
        job_execution_id: Uuid,
        source_id: Uuid,
    ) -> StoreResult<Vec<JournalRecord>> {
        Ok(lock(&self.records)
            .iter()
            .filter(|r| r.job_execution_id == job_execution_id && r.source_id == source_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Progress and monitoring
// ============================================================================

#[derive(Default)]
pub struct InMemoryProgressStore {
    progress: Mutex<HashMap<Uuid, JobExecutionProgress>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn initialize(&self, job_execution_id: Uuid, expected_total: i32) -> StoreResult<()> {
        lock(&self.progress)
            .entry(job_execution_id)
            .or_insert(JobExecutionProgress {
                job_execution_id,
                expected_total,
                succeeded: 0,
                failed: 0,
            });
        Ok(())
    }

    async fn increment(
        &self,
        job_execution_id: Uuid,
        succeeded_delta: i32,
        failed_delta: i32,
    ) -> StoreResult<JobExecutionProgress> {
        let mut progress = lock(&self.progress);
        let entry = progress
            .get_mut(&job_execution_id)
            .ok_or_else(|| StoreError::not_found("JobExecutionProgress", job_execution_id))?;
        entry.succeeded += succeeded_delta;
        entry.failed += failed_delta;
        Ok(*entry)
    }

    async fn get(&self, job_execution_id: Uuid) -> StoreResult<Option<JobExecutionProgress>> {
        Ok(lock(&self.progress).get(&job_execution_id).copied())
    }
}

#[derive(Default)]
pub struct InMemoryMonitoringStore {
    heartbeats: Mutex<HashMap<Uuid, JobMonitoring>>,
}

impl InMemoryMonitoringStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_event(&self, job_execution_id: Uuid) -> Option<DateTime<Utc>> {
        lock(&self.heartbeats)
            .get(&job_execution_id)
            .map(|m| m.last_event_timestamp)
    }
}

#[async_trait]
impl MonitoringStore for InMemoryMonitoringStore {
    async fn touch(&self, job_execution_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        lock(&self.heartbeats)
            .entry(job_execution_id)
            .and_modify(|m| m.last_event_timestamp = at)
            .or_insert(JobMonitoring {
                job_execution_id,
                last_event_timestamp: at,
                notification_sent: false,
            });
        Ok(())
    }
}

// ============================================================================
// External collaborators
// ============================================================================

/// Profile service stand-in: snapshots are registered up front
#[derive(Default)]
pub struct InMemoryProfileSnapshotClient {
    snapshots: Mutex<HashMap<Uuid, ProfileSnapshot>>,
    failing: AtomicBool,
}

impl InMemoryProfileSnapshotClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, snapshot: ProfileSnapshot) {
        lock(&self.snapshots).insert(snapshot.job_profile_id, snapshot);
    }

    /// Make every subsequent resolution fail, simulating an outage
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileSnapshotClient for InMemoryProfileSnapshotClient {
    async fn resolve(&self, job_profile_id: Uuid) -> StoreResult<ProfileSnapshot> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(
                "profile snapshot service unavailable".to_string(),
            ));
        }
        lock(&self.snapshots)
            .get(&job_profile_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("JobProfile", job_profile_id))
    }
}

/// Upstream snapshot state stand-in; deletion tolerates absence
#[derive(Default)]
pub struct InMemorySnapshotClient {
    deleted: Mutex<Vec<Uuid>>,
    failing: AtomicBool,
}

impl InMemorySnapshotClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deleted_jobs(&self) -> Vec<Uuid> {
        lock(&self.deleted).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotClient for InMemorySnapshotClient {
    async fn delete(&self, job_execution_id: Uuid) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("snapshot store unavailable".to_string()));
        }
        lock(&self.deleted).push(job_execution_id);
        Ok(())
    }
}

/// Collecting publisher: events are kept for inspection and logged
#[derive(Default)]
pub struct InMemoryRecordPublisher {
    events: Mutex<Vec<RecordEvent>>,
    failing: AtomicBool,
}

impl InMemoryRecordPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordEvent> {
        lock(&self.events).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordPublisher for InMemoryRecordPublisher {
    async fn publish(&self, event: RecordEvent) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("outbound channel unavailable".to_string()));
        }
        tracing::debug!(
            topic = event.channel.topic(),
            job_execution_id = %event.job_execution_id,
            incoming_record_id = %event.incoming_record_id,
            "Published record event"
        );
        lock(&self.events).push(event);
        Ok(())
    }
}

/// Publisher that only logs events, without retaining them
///
/// Bound in production wiring until broker integration is configured;
/// downstream handlers attach through the consumer registry instead.
#[derive(Default)]
pub struct TracingRecordPublisher;

#[async_trait]
impl RecordPublisher for TracingRecordPublisher {
    async fn publish(&self, event: RecordEvent) -> StoreResult<()> {
        tracing::info!(
            topic = event.channel.topic(),
            job_execution_id = %event.job_execution_id,
            incoming_record_id = %event.incoming_record_id,
            order = event.payload.order,
            "Record event emitted"
        );
        Ok(())
    }
}

/// Mapping-rules service stand-in with canned documents
#[derive(Default)]
pub struct StaticMappingMetadataProvider;

#[async_trait]
impl MappingMetadataProvider for StaticMappingMetadataProvider {
    async fn mapping_rules(&self, record_type: &str) -> StoreResult<serde_json::Value> {
        Ok(serde_json::json!({ "recordType": record_type, "rules": [] }))
    }

    async fn mapping_parameters(&self, tenant_id: &str) -> StoreResult<serde_json::Value> {
        Ok(serde_json::json!({ "tenantId": tenant_id }))
    }
}

// ============================================================================
// Bundled state
// ============================================================================

/// Every in-memory backend plus direct handles for assertions
pub struct InMemoryState {
    pub job_executions: Arc<InMemoryJobExecutionStore>,
    pub chunks: Arc<InMemorySourceChunkStore>,
    pub journal: Arc<InMemoryJournalStore>,
    pub progress: Arc<InMemoryProgressStore>,
    pub monitoring: Arc<InMemoryMonitoringStore>,
    pub profile_snapshots: Arc<InMemoryProfileSnapshotClient>,
    pub snapshots: Arc<InMemorySnapshotClient>,
    pub publisher: Arc<InMemoryRecordPublisher>,
}

impl InMemoryState {
    pub fn new() -> Self {
        Self {
            job_executions: Arc::new(InMemoryJobExecutionStore::new()),
            chunks: Arc::new(InMemorySourceChunkStore::new()),
            journal: Arc::new(InMemoryJournalStore::new()),
            progress: Arc::new(InMemoryProgressStore::new()),
            monitoring: Arc::new(InMemoryMonitoringStore::new()),
            profile_snapshots: Arc::new(InMemoryProfileSnapshotClient::new()),
            snapshots: Arc::new(InMemorySnapshotClient::new()),
            publisher: Arc::new(InMemoryRecordPublisher::new()),
        }
    }

    /// Build an [`AppContext`] over these backends
    pub fn context(&self, flow_control: FlowControlSettings) -> AppContext {
        AppContext {
            job_executions: self.job_executions.clone(),
            chunks: self.chunks.clone(),
            journal: self.journal.clone(),
            progress: self.progress.clone(),
            monitoring: self.monitoring.clone(),
            profile_snapshots: self.profile_snapshots.clone(),
            snapshots: self.snapshots.clone(),
            publisher: self.publisher.clone(),
            mapping_metadata: Arc::new(MappingMetadataCache::new(Arc::new(
                StaticMappingMetadataProvider,
            ))),
            flow_control: Arc::new(RawRecordsFlowControl::new(flow_control)),
        }
    }
}

impl Default for InMemoryState {
    fn default() -> Self {
        Self::new()
    }
}
