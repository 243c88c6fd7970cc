//! Domain models and wire DTOs
//!
//! Persistent rows (`JobExecution`, `JobExecutionSourceChunk`,
//! `JournalRecord`, counters) and the request/response DTOs of the
//! change-manager and metadata-provider endpoints.

pub mod profile;

use bibflow_common::types::{
    ActionStatus, ActionType, EntityType, ErrorStatus, JobExecutionStatus, SubordinationType,
    UiStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to an externally managed job profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProfileInfo {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// Identity of the user who started the job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunBy {
    pub first_name: String,
    pub last_name: String,
}

/// Progress counters carried on the job itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub total: i32,
    pub current: i32,
    pub currently_succeeded: i32,
    pub currently_failed: i32,
}

/// One end-to-end import run
///
/// Invariants: a PARENT_MULTIPLE job owns at least one CHILD and never
/// carries parsable records itself; only PARENT_SINGLE and CHILD jobs have
/// `source_path`/`file_name`; `id == parent_job_id` for any parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: Uuid,
    /// Human-readable sequential id
    pub hr_id: i32,
    pub parent_job_id: Uuid,
    pub subordination_type: SubordinationType,
    pub status: JobExecutionStatus,
    pub ui_status: UiStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_status: Option<ErrorStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_profile_info: Option<JobProfileInfo>,
    /// Resolved profile snapshot; set at most once per job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_snapshot_id: Option<Uuid>,
    /// Frozen from the snapshot at profile assignment: whether the profile
    /// creates a new instance per incoming bibliographic record
    #[serde(default)]
    pub profile_snapshot_creates_instance: bool,
    pub progress: Progress,
    pub run_by: RunBy,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub started_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
    /// Soft-delete flag; a deleted job behaves as not-found everywhere
    #[serde(default, skip_serializing)]
    pub deleted: bool,
    pub tenant_id: String,
}

impl JobExecution {
    /// Refresh the derived UI status after a status change
    pub fn sync_ui_status(&mut self) {
        self.ui_status = self.status.ui_status();
    }
}

/// State of one received batch of raw records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkState {
    InProgress,
    Completed,
    Error,
}

impl ChunkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for ChunkState {
    type Err = bibflow_common::types::UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "ERROR" => Ok(Self::Error),
            other => Err(bibflow_common::types::UnknownVariant {
                kind: "ChunkState",
                value: other.to_string(),
            }),
        }
    }
}

/// One received batch, owned exclusively by its job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecutionSourceChunk {
    pub id: Uuid,
    pub job_execution_id: Uuid,
    pub chunk_size: i32,
    /// Submitter's running record count after this chunk, inclusive
    pub records_counter: i32,
    pub last: bool,
    pub state: ChunkState,
    pub created_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
}

/// One immutable journal fact: entity E of type T underwent action A with
/// status S for incoming record R at order O
///
/// Rows are appended concurrently by unrelated downstream handlers; no
/// ordering between rows of the same source record is guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub id: Uuid,
    pub job_execution_id: Uuid,
    /// Incoming record id this fact belongs to
    pub source_id: Uuid,
    pub source_record_order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub entity_type: EntityType,
    pub action_type: ActionType,
    pub action_status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub action_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_hrid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holdings_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permanent_location_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub tenant_id: String,
}

/// Per-job counters used for completion detection
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobExecutionProgress {
    pub job_execution_id: Uuid,
    pub expected_total: i32,
    pub succeeded: i32,
    pub failed: i32,
}

/// Heartbeat row consumed by an external stall watchdog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMonitoring {
    pub job_execution_id: Uuid,
    pub last_event_timestamp: DateTime<Utc>,
    pub notification_sent: bool,
}

// ============================================================================
// Inbound DTOs
// ============================================================================

/// Content type of a submitted chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordsContentType {
    MarcRaw,
    MarcJson,
    EdifactRaw,
}

/// Metadata accompanying each chunk submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsMetadata {
    /// 1-based running counter of records sent so far, inclusive
    pub counter: i32,
    /// Declared total number of records in the whole job
    pub total: i32,
    pub last: bool,
    pub content_type: RecordsContentType,
}

/// One raw record with its optional explicit position in the source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialRecord {
    pub record: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

/// One submitted batch of raw records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecordsDto {
    pub id: Uuid,
    pub initial_records: Vec<InitialRecord>,
    pub records_metadata: RecordsMetadata,
}

/// Where the records of a new job come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitSourceType {
    Files,
    Online,
}

/// One file of a multi-file submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDto {
    pub name: String,
}

/// Request body for initializing job executions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitJobExecutionsRqDto {
    #[serde(default)]
    pub files: Vec<FileDto>,
    pub source_type: InitSourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_profile_info: Option<JobProfileInfo>,
    pub user_id: Uuid,
    #[serde(default)]
    pub run_by: RunBy,
    #[serde(default = "default_tenant")]
    pub tenant_id: String,
}

pub(crate) fn default_tenant() -> String {
    "diku".to_string()
}

/// Response for job initialization: the parent plus any children
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitJobExecutionsRsDto {
    pub parent_job_execution_id: Uuid,
    pub job_executions: Vec<JobExecution>,
}
