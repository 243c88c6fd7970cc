//! Per-record parsing, classification, enrichment, and emission
//!
//! One call per received chunk: repairs record ordering, parses and
//! classifies every raw record, applies the duplicate-creation guard,
//! writes PARSE journal rows, and emits exactly one event per record on
//! the channel matching its classification (or the error channel).
//! Per-record failures never abort the chunk; only a failure to reach the
//! outbound channel or the journal store does.

use bibflow_common::types::{ActionStatus, ActionType, EntityType};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::events::{RecordChannel, RecordEvent, RecordPayload};
use crate::engine::mapping_cache::MappingMetadataCache;
use crate::engine::marc::{MarcRecordClass, ParsedMarcRecord, HOLDINGS_LINKING_FIELD};
use crate::models::{InitialRecord, JobExecution, JournalRecord, RawRecordsDto, RecordsContentType};
use crate::storage::{JournalStore, RecordPublisher, StoreError};

/// Fixed message for the duplicate-creation guard
pub const MARC_BIB_RECORD_CREATED_BEFORE_MSG: &str =
    "Incoming record already contains a tracking subfield: it was created by a previous import \
     and cannot be created again by this profile";

/// Chunk-fatal change-engine failures
///
/// Everything else is absorbed as a per-record error outcome.
#[derive(Debug, Error)]
pub enum ChangeEngineError {
    #[error("failed to publish record event: {0}")]
    Publish(StoreError),

    #[error("failed to write journal rows: {0}")]
    Journal(StoreError),

    #[error("failed to fetch mapping metadata: {0}")]
    MappingMetadata(StoreError),
}

/// Counters describing what one chunk produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// Records emitted on a classified channel
    pub classified: usize,
    /// Records emitted on the error channel
    pub errored: usize,
    /// Records dropped entirely (holdings with no linking field)
    pub discarded: usize,
}

pub struct ChangeEngine {
    publisher: Arc<dyn RecordPublisher>,
    journal: Arc<dyn JournalStore>,
    mapping_metadata: Arc<MappingMetadataCache>,
}

impl ChangeEngine {
    pub fn new(
        publisher: Arc<dyn RecordPublisher>,
        journal: Arc<dyn JournalStore>,
        mapping_metadata: Arc<MappingMetadataCache>,
    ) -> Self {
        Self {
            publisher,
            journal,
            mapping_metadata,
        }
    }

    /// Process every record of one received chunk
    pub async fn process_chunk(
        &self,
        job: &JobExecution,
        dto: &RawRecordsDto,
    ) -> Result<ChunkOutcome, ChangeEngineError> {
        let mut records = dto.initial_records.clone();
        repair_orders(&mut records, dto.records_metadata.counter);

        let record_type = match dto.records_metadata.content_type {
            RecordsContentType::EdifactRaw => "edifact",
            RecordsContentType::MarcRaw | RecordsContentType::MarcJson => "marc-bib",
        };
        self.mapping_metadata
            .get_or_fetch(job.id, record_type, &job.tenant_id)
            .await
            .map_err(ChangeEngineError::MappingMetadata)?;

        let mut outcome = ChunkOutcome::default();
        let mut journal_rows = Vec::with_capacity(records.len());

        for record in &records {
            let incoming_record_id = Uuid::new_v4();
            let order = record.order.unwrap_or(0);

            let step = match dto.records_metadata.content_type {
                RecordsContentType::EdifactRaw => classify_edifact(record),
                RecordsContentType::MarcRaw | RecordsContentType::MarcJson => {
                    classify_marc(job, record, incoming_record_id)
                },
            };

            match step {
                RecordStep::Classified { channel, entity_type, parsed, title } => {
                    outcome.classified += 1;
                    journal_rows.push(parse_row(
                        job,
                        incoming_record_id,
                        order,
                        entity_type,
                        ActionStatus::Completed,
                        title,
                        None,
                    ));
                    self.publisher
                        .publish(RecordEvent {
                            channel,
                            job_execution_id: job.id,
                            profile_snapshot_id: job.profile_snapshot_id,
                            incoming_record_id,
                            tenant_id: job.tenant_id.clone(),
                            payload: RecordPayload {
                                parsed,
                                raw: record.record.clone(),
                                order,
                                error: None,
                            },
                        })
                        .await
                        .map_err(ChangeEngineError::Publish)?;
                },
                RecordStep::Errored { entity_type, message } => {
                    outcome.errored += 1;
                    tracing::warn!(
                        job_execution_id = %job.id,
                        incoming_record_id = %incoming_record_id,
                        error = %message,
                        "Record routed to error channel"
                    );
                    journal_rows.push(parse_row(
                        job,
                        incoming_record_id,
                        order,
                        entity_type,
                        ActionStatus::Error,
                        None,
                        Some(message.clone()),
                    ));
                    self.publisher
                        .publish(RecordEvent::error(
                            job.id,
                            job.profile_snapshot_id,
                            incoming_record_id,
                            job.tenant_id.clone(),
                            record.record.clone(),
                            order,
                            message,
                        ))
                        .await
                        .map_err(ChangeEngineError::Publish)?;
                },
                RecordStep::Discarded { reason } => {
                    outcome.discarded += 1;
                    tracing::warn!(
                        job_execution_id = %job.id,
                        order,
                        reason,
                        "Record discarded without emission"
                    );
                },
            }
        }

        if !journal_rows.is_empty() {
            self.journal
                .save_batch(&journal_rows)
                .await
                .map_err(ChangeEngineError::Journal)?;
        }

        Ok(outcome)
    }
}

/// What the engine decided to do with one record
enum RecordStep {
    Classified {
        channel: RecordChannel,
        entity_type: EntityType,
        parsed: Option<serde_json::Value>,
        title: Option<String>,
    },
    Errored {
        entity_type: EntityType,
        message: String,
    },
    Discarded {
        reason: &'static str,
    },
}

fn classify_edifact(_record: &InitialRecord) -> RecordStep {
    // EDIFACT payloads pass through opaque; invoice parsing happens in the
    // downstream invoice handler.
    RecordStep::Classified {
        channel: RecordChannel::Edifact,
        entity_type: EntityType::Edifact,
        parsed: None,
        title: None,
    }
}

fn classify_marc(
    job: &JobExecution,
    record: &InitialRecord,
    incoming_record_id: Uuid,
) -> RecordStep {
    let mut parsed = match ParsedMarcRecord::parse(&record.record) {
        Ok(parsed) => parsed,
        Err(error) => {
            return RecordStep::Errored {
                entity_type: EntityType::MarcBibliographic,
                message: error.to_string(),
            };
        },
    };

    let class = match parsed.classify() {
        Ok(class) => class,
        Err(error) => {
            return RecordStep::Errored {
                entity_type: EntityType::MarcBibliographic,
                message: error.to_string(),
            };
        },
    };

    if class == MarcRecordClass::Holdings && parsed.control_field(HOLDINGS_LINKING_FIELD).is_none()
    {
        return RecordStep::Discarded {
            reason: "holdings record has no 004 linking control field",
        };
    }

    if class == MarcRecordClass::Bibliographic
        && parsed.carries_tracking_subfield()
        && job_creates_instance(job)
    {
        return RecordStep::Errored {
            entity_type: EntityType::MarcBibliographic,
            message: MARC_BIB_RECORD_CREATED_BEFORE_MSG.to_string(),
        };
    }

    parsed.assign_tracking_subfield(&incoming_record_id.to_string());

    let (channel, entity_type) = match class {
        MarcRecordClass::Bibliographic => (RecordChannel::MarcBib, EntityType::MarcBibliographic),
        MarcRecordClass::Holdings => (RecordChannel::MarcHoldings, EntityType::MarcHoldings),
        MarcRecordClass::Authority => (RecordChannel::MarcAuthority, EntityType::MarcAuthority),
    };
    let title = parsed.title();

    RecordStep::Classified {
        channel,
        entity_type,
        parsed: Some(parsed.to_json()),
        title,
    }
}

fn job_creates_instance(job: &JobExecution) -> bool {
    // The snapshot tree itself lives with the profile service; the flag is
    // frozen onto the job when the profile is set.
    job.profile_snapshot_creates_instance
}

fn parse_row(
    job: &JobExecution,
    incoming_record_id: Uuid,
    order: i32,
    entity_type: EntityType,
    status: ActionStatus,
    title: Option<String>,
    error: Option<String>,
) -> JournalRecord {
    JournalRecord {
        id: Uuid::new_v4(),
        job_execution_id: job.id,
        source_id: incoming_record_id,
        source_record_order: order,
        title,
        entity_type,
        action_type: ActionType::Parse,
        action_status: status,
        error,
        action_date: Utc::now(),
        entity_id: None,
        entity_hrid: None,
        instance_id: None,
        holdings_id: None,
        permanent_location_id: None,
        order_id: None,
        tenant_id: job.tenant_id.clone(),
    }
}

/// Assign sequential orders to the whole batch when any record lacks one
///
/// The first record of the batch gets `counter - len`, preserving the
/// submitter's running count. Batches that already carry explicit orders
/// are left untouched, so re-running the repair is a no-op.
pub fn repair_orders(records: &mut [InitialRecord], counter: i32) {
    if records.iter().all(|r| r.order.is_some()) {
        return;
    }
    let base = (counter - records.len() as i32).max(0);
    for (index, record) in records.iter_mut().enumerate() {
        record.order = Some(base + index as i32);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::marc::tests::{bib_record, holdings_record};

    fn record(raw: String, order: Option<i32>) -> InitialRecord {
        InitialRecord { record: raw, order }
    }

    #[test]
    fn order_repair_assigns_sequential_orders() {
        let mut records = vec![
            record(bib_record(), None),
            record(bib_record(), Some(7)),
            record(bib_record(), None),
        ];
        repair_orders(&mut records, 3);
        let orders: Vec<_> = records.iter().map(|r| r.order.unwrap()).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn order_repair_is_idempotent_when_orders_exist() {
        let mut records = vec![
            record(bib_record(), Some(4)),
            record(bib_record(), Some(5)),
            record(bib_record(), Some(6)),
        ];
        repair_orders(&mut records, 7);
        let orders: Vec<_> = records.iter().map(|r| r.order.unwrap()).collect();
        assert_eq!(orders, vec![4, 5, 6]);
    }

    #[test]
    fn order_repair_offsets_by_running_counter() {
        let mut records = vec![record(bib_record(), None), record(bib_record(), None)];
        repair_orders(&mut records, 52);
        let orders: Vec<_> = records.iter().map(|r| r.order.unwrap()).collect();
        assert_eq!(orders, vec![50, 51]);
    }

    #[test]
    fn holdings_without_linking_field_is_discarded() {
        let job = crate::models::test_util::test_job();
        let step = classify_marc(&job, &record(holdings_record(false), Some(0)), Uuid::new_v4());
        assert!(matches!(step, RecordStep::Discarded { .. }));

        let step = classify_marc(&job, &record(holdings_record(true), Some(0)), Uuid::new_v4());
        assert!(matches!(
            step,
            RecordStep::Classified { channel: RecordChannel::MarcHoldings, .. }
        ));
    }

    #[test]
    fn duplicate_creation_guard_routes_to_error() {
        let mut job = crate::models::test_util::test_job();
        job.profile_snapshot_id = Some(Uuid::new_v4());
        job.profile_snapshot_creates_instance = true;

        let mut marked = ParsedMarcRecord::parse(&bib_record()).unwrap();
        marked.assign_tracking_subfield("previous-import-id");
        let raw = marked.to_json().to_string();

        let step = classify_marc(&job, &record(raw, Some(0)), Uuid::new_v4());
        match step {
            RecordStep::Errored { message, .. } => {
                assert_eq!(message, MARC_BIB_RECORD_CREATED_BEFORE_MSG);
            },
            _ => panic!("expected the duplicate-creation guard to fire"),
        }
    }

    #[test]
    fn tracked_record_passes_when_profile_does_not_create() {
        let job = crate::models::test_util::test_job();
        let mut marked = ParsedMarcRecord::parse(&bib_record()).unwrap();
        marked.assign_tracking_subfield("previous-import-id");
        let raw = marked.to_json().to_string();

        let step = classify_marc(&job, &record(raw, Some(0)), Uuid::new_v4());
        assert!(matches!(step, RecordStep::Classified { .. }));
    }
}
