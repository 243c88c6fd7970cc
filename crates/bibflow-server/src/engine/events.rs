//! Outbound record events
//!
//! The change engine emits exactly one event per incoming record, routed by
//! classification: one channel per entity type plus a shared error channel.
//! Every event carries the correlation triple (job execution id, profile
//! snapshot id, incoming record id) so downstream handlers and the journal
//! can attribute outcomes to the originating record even on parse failure.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbound channel a record event is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordChannel {
    MarcBib,
    MarcHoldings,
    MarcAuthority,
    Edifact,
    Error,
}

impl RecordChannel {
    /// Topic the broker-backed publisher writes this channel to
    pub fn topic(&self) -> &'static str {
        match self {
            Self::MarcBib => "bibflow.raw-marc-bib.chunk-parsed",
            Self::MarcHoldings => "bibflow.raw-marc-holdings.chunk-parsed",
            Self::MarcAuthority => "bibflow.raw-marc-authority.chunk-parsed",
            Self::Edifact => "bibflow.raw-edifact.chunk-parsed",
            Self::Error => "bibflow.raw-records.parsing-error",
        }
    }
}

/// Payload of one classified or errored record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Structured form, absent when parsing failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<serde_json::Value>,
    /// The raw record as submitted
    pub raw: String,
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One emitted record event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEvent {
    pub channel: RecordChannel,
    pub job_execution_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_snapshot_id: Option<Uuid>,
    /// Id assigned to the incoming record at receipt; the journal
    /// correlates on this value
    pub incoming_record_id: Uuid,
    pub tenant_id: String,
    pub payload: RecordPayload,
}

impl RecordEvent {
    pub fn error(
        job_execution_id: Uuid,
        profile_snapshot_id: Option<Uuid>,
        incoming_record_id: Uuid,
        tenant_id: String,
        raw: String,
        order: i32,
        message: String,
    ) -> Self {
        Self {
            channel: RecordChannel::Error,
            job_execution_id,
            profile_snapshot_id,
            incoming_record_id,
            tenant_id,
            payload: RecordPayload {
                parsed: None,
                raw,
                order,
                error: Some(message),
            },
        }
    }
}
