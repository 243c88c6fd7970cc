//! Closed domain enums shared across the bibflow workspace
//!
//! The status, entity and action sets are deliberately closed enums so that
//! every dispatch over them is exhaustiveness-checked: adding a variant
//! forces every reducer and transition table to acknowledge it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string does not name a known enum variant
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Lifecycle status of a job execution
///
/// `Parent` is reserved for PARENT_MULTIPLE jobs and is system-managed:
/// the public status-update path may neither enter nor leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobExecutionStatus {
    New,
    ParsingInProgress,
    ParsingFinished,
    ProcessingInProgress,
    ProcessingFinished,
    Committed,
    Error,
    Cancelled,
    Discarded,
    Parent,
}

impl JobExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::ParsingInProgress => "PARSING_IN_PROGRESS",
            Self::ParsingFinished => "PARSING_FINISHED",
            Self::ProcessingInProgress => "PROCESSING_IN_PROGRESS",
            Self::ProcessingFinished => "PROCESSING_FINISHED",
            Self::Committed => "COMMITTED",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Discarded => "DISCARDED",
            Self::Parent => "PARENT",
        }
    }

    /// Whether the job has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Committed | Self::Error | Self::Cancelled | Self::Discarded
        )
    }

    /// Whether a PARENT_MULTIPLE parent may count this child as done
    pub fn is_completed_for_parent(&self) -> bool {
        self.is_terminal()
    }

    /// Legality of a status transition on the public update path
    ///
    /// `Parent` is unreachable both ways; terminal states accept no further
    /// transitions except the cancel path out of `Error`.
    pub fn can_transition_to(&self, next: JobExecutionStatus) -> bool {
        use JobExecutionStatus::*;
        if *self == next {
            // Idempotent re-assertion of the current status is allowed so
            // that concurrent chunk handlers can each "ensure parsing".
            return !matches!(self, Parent);
        }
        match (*self, next) {
            (_, Parent) | (Parent, _) => false,
            (New, ParsingInProgress) => true,
            (New, Error | Cancelled | Discarded) => true,
            (ParsingInProgress, ParsingFinished) => true,
            (ParsingInProgress, Error | Cancelled | Discarded) => true,
            (ParsingFinished, ProcessingInProgress) => true,
            (ParsingFinished, Error | Cancelled | Discarded) => true,
            (ProcessingInProgress, ProcessingFinished) => true,
            (ProcessingInProgress, Error | Cancelled | Discarded) => true,
            (ProcessingFinished, Committed) => true,
            (ProcessingFinished, Error | Cancelled | Discarded) => true,
            (Error, Cancelled) => true,
            _ => false,
        }
    }

    /// The UI-facing status derived from the persisted status
    pub fn ui_status(&self) -> UiStatus {
        match self {
            Self::New => UiStatus::Initialization,
            Self::ParsingInProgress => UiStatus::PreparingForPreview,
            Self::ParsingFinished => UiStatus::ReadyForPreview,
            Self::ProcessingInProgress | Self::ProcessingFinished => UiStatus::Running,
            Self::Committed => UiStatus::RunningComplete,
            Self::Error => UiStatus::Error,
            Self::Cancelled => UiStatus::Cancelled,
            Self::Discarded => UiStatus::Discarded,
            Self::Parent => UiStatus::Parent,
        }
    }
}

impl std::str::FromStr for JobExecutionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PARSING_IN_PROGRESS" => Ok(Self::ParsingInProgress),
            "PARSING_FINISHED" => Ok(Self::ParsingFinished),
            "PROCESSING_IN_PROGRESS" => Ok(Self::ProcessingInProgress),
            "PROCESSING_FINISHED" => Ok(Self::ProcessingFinished),
            "COMMITTED" => Ok(Self::Committed),
            "ERROR" => Ok(Self::Error),
            "CANCELLED" => Ok(Self::Cancelled),
            "DISCARDED" => Ok(Self::Discarded),
            "PARENT" => Ok(Self::Parent),
            other => Err(UnknownVariant {
                kind: "JobExecutionStatus",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for JobExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI-facing projection of [`JobExecutionStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiStatus {
    Initialization,
    PreparingForPreview,
    ReadyForPreview,
    Running,
    RunningComplete,
    Error,
    Cancelled,
    Discarded,
    Parent,
}

impl UiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialization => "INITIALIZATION",
            Self::PreparingForPreview => "PREPARING_FOR_PREVIEW",
            Self::ReadyForPreview => "READY_FOR_PREVIEW",
            Self::Running => "RUNNING",
            Self::RunningComplete => "RUNNING_COMPLETE",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Discarded => "DISCARDED",
            Self::Parent => "PARENT",
        }
    }
}

impl std::str::FromStr for UiStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIALIZATION" => Ok(Self::Initialization),
            "PREPARING_FOR_PREVIEW" => Ok(Self::PreparingForPreview),
            "READY_FOR_PREVIEW" => Ok(Self::ReadyForPreview),
            "RUNNING" => Ok(Self::Running),
            "RUNNING_COMPLETE" => Ok(Self::RunningComplete),
            "ERROR" => Ok(Self::Error),
            "CANCELLED" => Ok(Self::Cancelled),
            "DISCARDED" => Ok(Self::Discarded),
            "PARENT" => Ok(Self::Parent),
            other => Err(UnknownVariant {
                kind: "UiStatus",
                value: other.to_string(),
            }),
        }
    }
}

/// Diagnostic code recorded when a job enters `Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorStatus {
    FileProcessingError,
    ProfileSnapshotCreationError,
    SnapshotUpdateError,
    RecordUpdateError,
    InstanceCreatingError,
}

impl ErrorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileProcessingError => "FILE_PROCESSING_ERROR",
            Self::ProfileSnapshotCreationError => "PROFILE_SNAPSHOT_CREATION_ERROR",
            Self::SnapshotUpdateError => "SNAPSHOT_UPDATE_ERROR",
            Self::RecordUpdateError => "RECORD_UPDATE_ERROR",
            Self::InstanceCreatingError => "INSTANCE_CREATING_ERROR",
        }
    }
}

impl std::str::FromStr for ErrorStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FILE_PROCESSING_ERROR" => Ok(Self::FileProcessingError),
            "PROFILE_SNAPSHOT_CREATION_ERROR" => Ok(Self::ProfileSnapshotCreationError),
            "SNAPSHOT_UPDATE_ERROR" => Ok(Self::SnapshotUpdateError),
            "RECORD_UPDATE_ERROR" => Ok(Self::RecordUpdateError),
            "INSTANCE_CREATING_ERROR" => Ok(Self::InstanceCreatingError),
            other => Err(UnknownVariant {
                kind: "ErrorStatus",
                value: other.to_string(),
            }),
        }
    }
}

/// Position of a job execution in the parent/child tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubordinationType {
    /// Single-file import: the job is its own parent
    ParentSingle,
    /// Multi-file import umbrella; carries no parsable records itself
    ParentMultiple,
    /// One file of a multi-file import
    Child,
}

impl SubordinationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParentSingle => "PARENT_SINGLE",
            Self::ParentMultiple => "PARENT_MULTIPLE",
            Self::Child => "CHILD",
        }
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Self::ParentSingle | Self::ParentMultiple)
    }
}

impl std::str::FromStr for SubordinationType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PARENT_SINGLE" => Ok(Self::ParentSingle),
            "PARENT_MULTIPLE" => Ok(Self::ParentMultiple),
            "CHILD" => Ok(Self::Child),
            other => Err(UnknownVariant {
                kind: "SubordinationType",
                value: other.to_string(),
            }),
        }
    }
}

/// Entity types a journal row may describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    MarcBibliographic,
    MarcHoldings,
    MarcAuthority,
    Instance,
    Holdings,
    Item,
    Authority,
    Order,
    PoLine,
    Invoice,
    Edifact,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarcBibliographic => "MARC_BIBLIOGRAPHIC",
            Self::MarcHoldings => "MARC_HOLDINGS",
            Self::MarcAuthority => "MARC_AUTHORITY",
            Self::Instance => "INSTANCE",
            Self::Holdings => "HOLDINGS",
            Self::Item => "ITEM",
            Self::Authority => "AUTHORITY",
            Self::Order => "ORDER",
            Self::PoLine => "PO_LINE",
            Self::Invoice => "INVOICE",
            Self::Edifact => "EDIFACT",
        }
    }

    /// Source record types: the row that carries the display title
    pub fn is_source_record(&self) -> bool {
        matches!(
            self,
            Self::MarcBibliographic | Self::MarcHoldings | Self::MarcAuthority | Self::Edifact
        )
    }

    /// Child types that may legitimately occur several times per source
    /// record (several holdings or items under one bibliographic record)
    pub fn allows_multiple(&self) -> bool {
        matches!(self, Self::Holdings | Self::Item)
    }
}

impl std::str::FromStr for EntityType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MARC_BIBLIOGRAPHIC" => Ok(Self::MarcBibliographic),
            "MARC_HOLDINGS" => Ok(Self::MarcHoldings),
            "MARC_AUTHORITY" => Ok(Self::MarcAuthority),
            "INSTANCE" => Ok(Self::Instance),
            "HOLDINGS" => Ok(Self::Holdings),
            "ITEM" => Ok(Self::Item),
            "AUTHORITY" => Ok(Self::Authority),
            "ORDER" => Ok(Self::Order),
            "PO_LINE" => Ok(Self::PoLine),
            "INVOICE" => Ok(Self::Invoice),
            "EDIFACT" => Ok(Self::Edifact),
            other => Err(UnknownVariant {
                kind: "EntityType",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action a downstream handler performed on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Create,
    Update,
    Modify,
    Match,
    NonMatch,
    Parse,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Modify => "MODIFY",
            Self::Match => "MATCH",
            Self::NonMatch => "NON_MATCH",
            Self::Parse => "PARSE",
        }
    }

    /// Match steps alone do not constitute an outcome
    pub fn is_match_step(&self) -> bool {
        matches!(self, Self::Match | Self::NonMatch)
    }
}

impl std::str::FromStr for ActionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "MODIFY" => Ok(Self::Modify),
            "MATCH" => Ok(Self::Match),
            "NON_MATCH" => Ok(Self::NonMatch),
            "PARSE" => Ok(Self::Parse),
            other => Err(UnknownVariant {
                kind: "ActionType",
                value: other.to_string(),
            }),
        }
    }
}

/// Outcome of a single journal-recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Completed,
    Error,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(Self::Completed),
            "ERROR" => Ok(Self::Error),
            other => Err(UnknownVariant {
                kind: "ActionStatus",
                value: other.to_string(),
            }),
        }
    }
}
