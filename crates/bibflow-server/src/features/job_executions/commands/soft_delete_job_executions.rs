//! Soft-delete job executions command
//!
//! Bulk marks jobs as deleted. Deleted jobs behave as not-found for every
//! later read and mutation; the rows stay for audit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{AppContext, StoreError};

/// Command to soft-delete a set of job executions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftDeleteJobExecutionsCommand {
    pub ids: Vec<Uuid>,
}

/// Per-id outcome of a bulk soft delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftDeleteOutcome {
    pub id: Uuid,
    pub is_deleted: bool,
}

/// Response listing each requested id with its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftDeleteJobExecutionsResponse {
    pub job_execution_details: Vec<SoftDeleteOutcome>,
}

/// Errors that can occur when soft-deleting
#[derive(Debug, thiserror::Error)]
pub enum SoftDeleteError {
    /// The request named no ids
    #[error("At least one job execution id must be given")]
    Empty,

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Handles bulk soft deletion
pub async fn handle(
    ctx: &AppContext,
    command: SoftDeleteJobExecutionsCommand,
) -> Result<SoftDeleteJobExecutionsResponse, SoftDeleteError> {
    if command.ids.is_empty() {
        return Err(SoftDeleteError::Empty);
    }

    let outcomes = ctx.job_executions.soft_delete(&command.ids).await?;
    let deleted = outcomes.iter().filter(|(_, flag)| *flag).count();
    tracing::info!(requested = command.ids.len(), deleted, "Soft-deleted job executions");

    Ok(SoftDeleteJobExecutionsResponse {
        job_execution_details: outcomes
            .into_iter()
            .map(|(id, is_deleted)| SoftDeleteOutcome { id, is_deleted })
            .collect(),
    })
}
