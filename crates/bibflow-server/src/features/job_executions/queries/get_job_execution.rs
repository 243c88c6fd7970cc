//! Get job execution query

use uuid::Uuid;

use crate::models::JobExecution;
use crate::storage::{AppContext, StoreError};

/// Query for one job execution by id
#[derive(Debug, Clone, Copy)]
pub struct GetJobExecutionQuery {
    pub job_execution_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetJobExecutionError {
    /// The job does not exist or is soft-deleted
    #[error("JobExecution '{0}' not found")]
    JobNotFound(Uuid),

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub async fn handle(
    ctx: &AppContext,
    query: GetJobExecutionQuery,
) -> Result<JobExecution, GetJobExecutionError> {
    ctx.job_executions
        .get(query.job_execution_id)
        .await?
        .ok_or(GetJobExecutionError::JobNotFound(query.job_execution_id))
}
