//! Get record entry query
//!
//! Detailed view of one source record's outcomes. The same reduction as
//! the list view runs over just that record's rows, so an invoice record
//! yields its header group plus one group per invoice line.

use serde::Serialize;
use uuid::Uuid;

use super::super::reducer::{reduce, JobLogEntry};
use crate::storage::{AppContext, StoreError};

/// Query for one source record's processing outcomes
#[derive(Debug, Clone)]
pub struct GetRecordEntryQuery {
    pub job_execution_id: Uuid,
    pub record_id: Uuid,
}

/// All groups derived from one source record's rows
#[derive(Debug, Clone, Serialize)]
pub struct RecordEntryResponse {
    pub entries: Vec<JobLogEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetRecordEntryError {
    /// The journal holds no rows for this record within the job
    #[error("JobLogEntry with jobExecutionId '{job_execution_id}' and recordId '{record_id}' was not found")]
    NotFound {
        job_execution_id: Uuid,
        record_id: Uuid,
    },

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub async fn handle(
    ctx: &AppContext,
    query: GetRecordEntryQuery,
) -> Result<RecordEntryResponse, GetRecordEntryError> {
    let rows = ctx
        .journal
        .by_job_and_source(query.job_execution_id, query.record_id)
        .await?;
    if rows.is_empty() {
        return Err(GetRecordEntryError::NotFound {
            job_execution_id: query.job_execution_id,
            record_id: query.record_id,
        });
    }
    Ok(RecordEntryResponse {
        entries: reduce(&rows),
    })
}
