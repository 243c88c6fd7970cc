//! Write journal records command
//!
//! Append-only batch insert used by downstream outcome handlers (the
//! change engine writes its PARSE rows directly). Every non-PARSE row
//! reports one record outcome, so the batch also advances the job's
//! progress counters, releases flow-control slots, and refreshes the
//! stall heartbeat.

use bibflow_common::types::{ActionStatus, ActionType};
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::JournalRecord;
use crate::storage::{AppContext, StoreError};

/// Command carrying one batch of journal rows
#[derive(Debug, Clone)]
pub struct WriteJournalRecordsCommand {
    pub records: Vec<JournalRecord>,
}

/// Errors that can occur when writing journal rows
#[derive(Debug, thiserror::Error)]
pub enum WriteJournalRecordsError {
    /// The batch named no rows
    #[error("At least one journal record must be given")]
    Empty,

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Handles one batch append
pub async fn handle(
    ctx: &AppContext,
    command: WriteJournalRecordsCommand,
) -> Result<(), WriteJournalRecordsError> {
    if command.records.is_empty() {
        return Err(WriteJournalRecordsError::Empty);
    }

    ctx.journal.save_batch(&command.records).await?;

    let mut deltas: HashMap<Uuid, (i32, i32)> = HashMap::new();
    for record in &command.records {
        if record.action_type == ActionType::Parse {
            continue;
        }
        ctx.flow_control.track_record_complete();
        let entry = deltas.entry(record.job_execution_id).or_default();
        match record.action_status {
            ActionStatus::Completed => entry.0 += 1,
            ActionStatus::Error => entry.1 += 1,
        }
    }

    for (job_execution_id, (succeeded, failed)) in deltas {
        // Outcomes can race the first chunk; a missing progress row only
        // means initialization has not happened yet
        if let Err(error) = ctx.progress.increment(job_execution_id, succeeded, failed).await {
            tracing::debug!(
                job_execution_id = %job_execution_id,
                error = %error,
                "Progress increment skipped"
            );
        }
        ctx.monitoring.touch(job_execution_id, Utc::now()).await?;
    }

    Ok(())
}
