//! Set job profile command
//!
//! Resolves the chosen profile into a frozen snapshot through the
//! external profile service. A job gets exactly one snapshot; attempting
//! to assign a second profile is a client error. When resolution fails
//! the job itself is marked failed so it does not sit NEW forever.

use bibflow_common::types::{ErrorStatus, JobExecutionStatus};
use uuid::Uuid;

use super::update_status::apply_status;
use crate::models::{JobExecution, JobProfileInfo};
use crate::storage::{AppContext, StoreError};

/// Command to assign a job profile to a job execution
#[derive(Debug, Clone)]
pub struct SetJobProfileCommand {
    pub job_execution_id: Uuid,
    pub job_profile_info: JobProfileInfo,
}

/// Errors that can occur when assigning a profile
#[derive(Debug, thiserror::Error)]
pub enum SetJobProfileError {
    /// The job does not exist or is soft-deleted
    #[error("JobExecution '{0}' not found")]
    JobNotFound(Uuid),

    /// A snapshot was already resolved for this job
    #[error("JobExecution '{0}' already has a profile snapshot; only one profile per job")]
    ProfileAlreadySet(Uuid),

    /// The profile service failed to resolve a snapshot
    #[error("Profile snapshot resolution failed: {0}")]
    SnapshotResolution(StoreError),

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Handles profile assignment
pub async fn handle(
    ctx: &AppContext,
    command: SetJobProfileCommand,
) -> Result<JobExecution, SetJobProfileError> {
    let mut job = ctx
        .job_executions
        .get(command.job_execution_id)
        .await?
        .ok_or(SetJobProfileError::JobNotFound(command.job_execution_id))?;

    if job.profile_snapshot_id.is_some() {
        return Err(SetJobProfileError::ProfileAlreadySet(job.id));
    }

    match ctx.profile_snapshots.resolve(command.job_profile_info.id).await {
        Ok(snapshot) => {
            job.job_profile_info = Some(command.job_profile_info);
            job.profile_snapshot_id = Some(snapshot.id);
            job.profile_snapshot_creates_instance = snapshot.creates_instance();
            ctx.job_executions.update(&job).await?;
            tracing::info!(
                job_execution_id = %job.id,
                profile_snapshot_id = %snapshot.id,
                "Job profile assigned"
            );
            Ok(job)
        },
        Err(error) => {
            tracing::error!(
                job_execution_id = %job.id,
                job_profile_id = %command.job_profile_info.id,
                error = %error,
                "Profile snapshot resolution failed; failing the job"
            );
            apply_status(
                &mut job,
                JobExecutionStatus::Error,
                Some(ErrorStatus::ProfileSnapshotCreationError),
            );
            ctx.job_executions.update(&job).await?;
            Err(SetJobProfileError::SnapshotResolution(error))
        },
    }
}
