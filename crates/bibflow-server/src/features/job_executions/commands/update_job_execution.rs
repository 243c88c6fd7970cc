//! Update job execution command
//!
//! Whole-document replacement of a job execution. Status transitions go
//! through `update_status`; this operation is for progress, run-by and
//! profile-info edits and leaves the persisted status machine alone when
//! the submitted status matches.

use uuid::Uuid;

use crate::models::JobExecution;
use crate::storage::{AppContext, StoreError};

/// Command carrying the full replacement document
#[derive(Debug, Clone)]
pub struct UpdateJobExecutionCommand {
    pub job_execution: JobExecution,
}

/// Errors that can occur when replacing a job execution
#[derive(Debug, thiserror::Error)]
pub enum UpdateJobExecutionError {
    /// The job does not exist or is soft-deleted
    #[error("JobExecution '{0}' not found")]
    JobNotFound(Uuid),

    /// The document tries to change fields that are immutable after init
    #[error("Field '{0}' of a job execution cannot be changed")]
    ImmutableField(&'static str),

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Handles a whole-document update
pub async fn handle(
    ctx: &AppContext,
    command: UpdateJobExecutionCommand,
) -> Result<JobExecution, UpdateJobExecutionError> {
    let mut incoming = command.job_execution;

    let existing = ctx
        .job_executions
        .get(incoming.id)
        .await?
        .ok_or(UpdateJobExecutionError::JobNotFound(incoming.id))?;

    if incoming.parent_job_id != existing.parent_job_id {
        return Err(UpdateJobExecutionError::ImmutableField("parent_job_id"));
    }
    if incoming.subordination_type != existing.subordination_type {
        return Err(UpdateJobExecutionError::ImmutableField("subordination_type"));
    }
    if incoming.hr_id != existing.hr_id {
        return Err(UpdateJobExecutionError::ImmutableField("hr_id"));
    }

    incoming.sync_ui_status();
    ctx.job_executions.update(&incoming).await?;
    Ok(incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::flow_control::FlowControlSettings;
    use crate::models::test_util::test_job;
    use crate::storage::memory::InMemoryState;

    #[tokio::test]
    async fn replaces_mutable_fields() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let job = test_job();
        ctx.job_executions.save(&job).await.unwrap();

        let mut updated = job.clone();
        updated.progress.total = 500;
        updated.progress.current = 20;

        handle(&ctx, UpdateJobExecutionCommand { job_execution: updated }).await.unwrap();

        let stored = ctx.job_executions.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.progress.total, 500);
    }

    #[tokio::test]
    async fn rejects_subordination_change() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let job = test_job();
        ctx.job_executions.save(&job).await.unwrap();

        let mut updated = job.clone();
        updated.subordination_type = bibflow_common::types::SubordinationType::Child;

        let result = handle(&ctx, UpdateJobExecutionCommand { job_execution: updated }).await;
        assert!(matches!(result, Err(UpdateJobExecutionError::ImmutableField(_))));
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let result =
            handle(&ctx, UpdateJobExecutionCommand { job_execution: test_job() }).await;
        assert!(matches!(result, Err(UpdateJobExecutionError::JobNotFound(_))));
    }
}
