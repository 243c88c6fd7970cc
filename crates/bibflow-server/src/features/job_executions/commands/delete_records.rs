//! Delete records command
//!
//! Cancels an uncommitted job and best-effort deletes its upstream
//! source-record snapshot. Once a job is COMMITTED its records are part
//! of the catalog and can no longer be withdrawn this way.

use bibflow_common::types::JobExecutionStatus;
use uuid::Uuid;

use super::update_status::apply_status;
use crate::models::JobExecution;
use crate::storage::{AppContext, StoreError};

/// Command to cancel a job and drop its unprocessed records
#[derive(Debug, Clone)]
pub struct DeleteRecordsCommand {
    pub job_execution_id: Uuid,
}

/// Errors that can occur when deleting records
#[derive(Debug, thiserror::Error)]
pub enum DeleteRecordsError {
    /// The job does not exist or is soft-deleted
    #[error("JobExecution '{0}' not found")]
    JobNotFound(Uuid),

    /// Committed jobs cannot have their records deleted
    #[error("Records of a committed job execution cannot be deleted")]
    AlreadyCommitted,

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Handles record deletion
pub async fn handle(
    ctx: &AppContext,
    command: DeleteRecordsCommand,
) -> Result<JobExecution, DeleteRecordsError> {
    let mut job = ctx
        .job_executions
        .get(command.job_execution_id)
        .await?
        .ok_or(DeleteRecordsError::JobNotFound(command.job_execution_id))?;

    if job.status == JobExecutionStatus::Committed {
        return Err(DeleteRecordsError::AlreadyCommitted);
    }

    apply_status(&mut job, JobExecutionStatus::Cancelled, None);
    ctx.job_executions.update(&job).await?;

    // Snapshot deletion is best-effort; the job is already cancelled and a
    // missing snapshot means there is nothing to clean up
    if let Err(error) = ctx.snapshots.delete(job.id).await {
        tracing::warn!(
            job_execution_id = %job.id,
            error = %error,
            "Upstream snapshot deletion failed after cancellation"
        );
    }

    tracing::info!(job_execution_id = %job.id, "Job execution cancelled, records deleted");
    Ok(job)
}
