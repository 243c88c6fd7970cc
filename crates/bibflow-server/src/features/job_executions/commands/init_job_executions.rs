//! Initialize job executions command
//!
//! One submitted file yields a single PARENT_SINGLE job; several files
//! yield a PARENT_MULTIPLE umbrella job plus one CHILD per file; an
//! ONLINE source yields a PARENT_SINGLE job with no file name. Every job
//! gets a sequential human-readable id from the store.

use bibflow_common::types::{JobExecutionStatus, SubordinationType};
use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    InitJobExecutionsRqDto, InitJobExecutionsRsDto, InitSourceType, JobExecution, Progress,
};
use crate::storage::{AppContext, StoreError};

/// Command to initialize the job executions of one import
#[derive(Debug, Clone)]
pub struct InitJobExecutionsCommand {
    pub request: InitJobExecutionsRqDto,
}

/// Errors that can occur when initializing job executions
#[derive(Debug, thiserror::Error)]
pub enum InitJobExecutionsError {
    /// Neither files nor an ONLINE source were given
    #[error("Request must contain either files or source type ONLINE")]
    NoSource,

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Handles job execution initialization
pub async fn handle(
    ctx: &AppContext,
    command: InitJobExecutionsCommand,
) -> Result<InitJobExecutionsRsDto, InitJobExecutionsError> {
    let request = command.request;

    if request.source_type == InitSourceType::Files && request.files.is_empty() {
        return Err(InitJobExecutionsError::NoSource);
    }

    let jobs = match request.source_type {
        InitSourceType::Online => {
            let hr_ids = ctx.job_executions.next_hr_ids(1).await?;
            vec![single_parent(&request, hr_ids[0], None)]
        },
        InitSourceType::Files if request.files.len() == 1 => {
            let hr_ids = ctx.job_executions.next_hr_ids(1).await?;
            vec![single_parent(&request, hr_ids[0], Some(request.files[0].name.clone()))]
        },
        InitSourceType::Files => {
            let hr_ids = ctx.job_executions.next_hr_ids(request.files.len() + 1).await?;
            let parent_id = Uuid::new_v4();
            let mut jobs = vec![multi_parent(&request, parent_id, hr_ids[0])];
            for (file, hr_id) in request.files.iter().zip(&hr_ids[1..]) {
                jobs.push(child(&request, parent_id, *hr_id, file.name.clone()));
            }
            jobs
        },
    };

    for job in &jobs {
        ctx.job_executions.save(job).await?;
    }

    let parent_job_execution_id = jobs[0].id;
    tracing::info!(
        parent_job_execution_id = %parent_job_execution_id,
        job_count = jobs.len(),
        "Initialized job executions"
    );

    Ok(InitJobExecutionsRsDto {
        parent_job_execution_id,
        job_executions: jobs,
    })
}

fn base_job(request: &InitJobExecutionsRqDto, hr_id: i32) -> JobExecution {
    let id = Uuid::new_v4();
    JobExecution {
        id,
        hr_id,
        parent_job_id: id,
        subordination_type: SubordinationType::ParentSingle,
        status: JobExecutionStatus::New,
        ui_status: JobExecutionStatus::New.ui_status(),
        error_status: None,
        job_profile_info: request.job_profile_info.clone(),
        profile_snapshot_id: None,
        profile_snapshot_creates_instance: false,
        progress: Progress::default(),
        run_by: request.run_by.clone(),
        user_id: request.user_id,
        source_path: None,
        file_name: None,
        started_date: Utc::now(),
        completed_date: None,
        deleted: false,
        tenant_id: request.tenant_id.clone(),
    }
}

fn single_parent(
    request: &InitJobExecutionsRqDto,
    hr_id: i32,
    file_name: Option<String>,
) -> JobExecution {
    let mut job = base_job(request, hr_id);
    job.source_path = file_name.clone();
    job.file_name = file_name;
    job
}

fn multi_parent(request: &InitJobExecutionsRqDto, parent_id: Uuid, hr_id: i32) -> JobExecution {
    let mut job = base_job(request, hr_id);
    job.id = parent_id;
    job.parent_job_id = parent_id;
    job.subordination_type = SubordinationType::ParentMultiple;
    job.status = JobExecutionStatus::Parent;
    job.ui_status = JobExecutionStatus::Parent.ui_status();
    job
}

fn child(
    request: &InitJobExecutionsRqDto,
    parent_id: Uuid,
    hr_id: i32,
    file_name: String,
) -> JobExecution {
    let mut job = base_job(request, hr_id);
    job.parent_job_id = parent_id;
    job.subordination_type = SubordinationType::Child;
    job.source_path = Some(file_name.clone());
    job.file_name = Some(file_name);
    job
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::flow_control::FlowControlSettings;
    use crate::models::{FileDto, RunBy};
    use crate::storage::memory::InMemoryState;

    fn request(files: Vec<&str>, source_type: InitSourceType) -> InitJobExecutionsRqDto {
        InitJobExecutionsRqDto {
            files: files.into_iter().map(|name| FileDto { name: name.to_string() }).collect(),
            source_type,
            job_profile_info: None,
            user_id: Uuid::new_v4(),
            run_by: RunBy::default(),
            tenant_id: "diku".to_string(),
        }
    }

    fn ctx() -> AppContext {
        InMemoryState::new().context(FlowControlSettings::default())
    }

    #[tokio::test]
    async fn single_file_creates_one_parent_single() {
        let ctx = ctx();
        let response = handle(
            &ctx,
            InitJobExecutionsCommand { request: request(vec!["a.mrc"], InitSourceType::Files) },
        )
        .await
        .unwrap();

        assert_eq!(response.job_executions.len(), 1);
        let job = &response.job_executions[0];
        assert_eq!(job.subordination_type, SubordinationType::ParentSingle);
        assert_eq!(job.status, JobExecutionStatus::New);
        assert_eq!(job.id, job.parent_job_id);
        assert_eq!(job.file_name.as_deref(), Some("a.mrc"));
    }

    #[tokio::test]
    async fn twenty_five_files_create_parent_plus_children() {
        let ctx = ctx();
        let files: Vec<String> = (0..25).map(|i| format!("file{i}.mrc")).collect();
        let response = handle(
            &ctx,
            InitJobExecutionsCommand {
                request: request(files.iter().map(String::as_str).collect(), InitSourceType::Files),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.job_executions.len(), 26);
        let parent = &response.job_executions[0];
        assert_eq!(parent.subordination_type, SubordinationType::ParentMultiple);
        assert_eq!(parent.status, JobExecutionStatus::Parent);
        assert!(parent.file_name.is_none());
        for child in &response.job_executions[1..] {
            assert_eq!(child.subordination_type, SubordinationType::Child);
            assert_eq!(child.parent_job_id, parent.id);
            assert_eq!(child.status, JobExecutionStatus::New);
        }

        // hr_ids are sequential across the whole batch
        let hr_ids: Vec<i32> = response.job_executions.iter().map(|j| j.hr_id).collect();
        assert_eq!(hr_ids, (1..=26).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn online_source_needs_no_files() {
        let ctx = ctx();
        let response = handle(
            &ctx,
            InitJobExecutionsCommand { request: request(vec![], InitSourceType::Online) },
        )
        .await
        .unwrap();

        assert_eq!(response.job_executions.len(), 1);
        assert!(response.job_executions[0].file_name.is_none());
    }

    #[tokio::test]
    async fn files_source_without_files_is_rejected() {
        let ctx = ctx();
        let result = handle(
            &ctx,
            InitJobExecutionsCommand { request: request(vec![], InitSourceType::Files) },
        )
        .await;
        assert!(matches!(result, Err(InitJobExecutionsError::NoSource)));
    }
}
