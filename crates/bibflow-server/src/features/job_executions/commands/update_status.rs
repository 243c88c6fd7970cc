//! Update job execution status command
//!
//! Applies one transition of the job status machine. PARENT is reserved:
//! it can neither be requested as a target nor left through this command.
//! A CHILD update re-derives its PARENT_MULTIPLE parent's aggregate
//! status.

use bibflow_common::types::{ErrorStatus, JobExecutionStatus, SubordinationType};
use chrono::Utc;
use uuid::Uuid;

use crate::models::JobExecution;
use crate::storage::{AppContext, StoreError};

/// Command to move a job execution to a new status
#[derive(Debug, Clone)]
pub struct UpdateStatusCommand {
    pub job_execution_id: Uuid,
    pub status: JobExecutionStatus,
    pub error_status: Option<ErrorStatus>,
}

/// Errors that can occur when updating a status
#[derive(Debug, thiserror::Error)]
pub enum UpdateStatusError {
    /// The job does not exist or is soft-deleted
    #[error("JobExecution '{0}' not found")]
    JobNotFound(Uuid),

    /// PARENT is system-managed and never a legal request
    #[error("Status PARENT cannot be set or updated through this operation")]
    ParentStatus,

    /// The requested transition is not in the legal set
    #[error("Transition {from:?} -> {to:?} is not allowed")]
    InvalidTransition {
        from: JobExecutionStatus,
        to: JobExecutionStatus,
    },

    /// A CHILD job references a parent that does not exist
    #[error("Parent job '{0}' not found for child update")]
    MissingParent(Uuid),

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Handles a status update request
pub async fn handle(
    ctx: &AppContext,
    command: UpdateStatusCommand,
) -> Result<JobExecution, UpdateStatusError> {
    if command.status == JobExecutionStatus::Parent {
        return Err(UpdateStatusError::ParentStatus);
    }

    // Always transition from the latest persisted state, not from whatever
    // the caller last saw
    let mut job = ctx
        .job_executions
        .get(command.job_execution_id)
        .await?
        .ok_or(UpdateStatusError::JobNotFound(command.job_execution_id))?;

    if job.status == JobExecutionStatus::Parent {
        return Err(UpdateStatusError::ParentStatus);
    }

    if !job.status.can_transition_to(command.status) {
        return Err(UpdateStatusError::InvalidTransition {
            from: job.status,
            to: command.status,
        });
    }

    apply_status(&mut job, command.status, command.error_status);
    ctx.job_executions.update(&job).await?;

    tracing::info!(
        job_execution_id = %job.id,
        status = job.status.as_str(),
        "Job execution status updated"
    );

    if job.subordination_type == SubordinationType::Child {
        aggregate_parent(ctx, &job).await?;
    }

    if job.status.is_terminal() {
        ctx.mapping_metadata.evict(job.id).await;
    }

    Ok(job)
}

/// Mutate a job for its new status, keeping derived fields consistent
pub(crate) fn apply_status(
    job: &mut JobExecution,
    status: JobExecutionStatus,
    error_status: Option<ErrorStatus>,
) {
    job.status = status;
    job.sync_ui_status();
    if let Some(error_status) = error_status {
        job.error_status = Some(error_status);
    }

    if status.is_terminal() {
        job.completed_date = Some(Utc::now());
    }
    if status == JobExecutionStatus::Error {
        // Nothing further will arrive; stop the progress bar where it is
        job.progress.total = job.progress.current;
    }
}

/// Re-derive a PARENT_MULTIPLE parent's status after a child update
async fn aggregate_parent(ctx: &AppContext, child: &JobExecution) -> Result<(), UpdateStatusError> {
    let mut parent = ctx
        .job_executions
        .get(child.parent_job_id)
        .await?
        .ok_or(UpdateStatusError::MissingParent(child.parent_job_id))?;

    if parent.subordination_type != SubordinationType::ParentMultiple
        || parent.status != JobExecutionStatus::Parent
    {
        return Ok(());
    }

    let (children, total) = ctx.job_executions.children(parent.id, i64::MAX, 0).await?;
    let all_done =
        total as usize == children.len() && children.iter().all(|c| c.status.is_completed_for_parent());
    if !all_done {
        return Ok(());
    }

    // The aggregate write bypasses can_transition_to: PARENT is reserved for
    // exactly this system-managed edge
    parent.status = JobExecutionStatus::Committed;
    parent.sync_ui_status();
    parent.completed_date = Some(Utc::now());
    ctx.job_executions.update(&parent).await?;

    tracing::info!(
        job_execution_id = %parent.id,
        "All children finished; parent marked committed"
    );
    Ok(())
}
