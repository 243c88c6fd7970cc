//! Job execution routes
//!
//! Mounted under `/change-manager/job-executions`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::commands::{
    delete_records, init_job_executions, set_job_profile, soft_delete_job_executions,
    update_job_execution, update_status, DeleteRecordsCommand, InitJobExecutionsCommand,
    SetJobProfileCommand, SoftDeleteJobExecutionsCommand, UpdateJobExecutionCommand,
    UpdateStatusCommand,
};
use super::queries::{
    get_job_execution, list_children, GetJobExecutionQuery, ListChildrenQuery,
};
use crate::error::AppError;
use crate::features::shared::pagination::PaginationParams;
use crate::features::FeatureState;
use crate::models::{InitJobExecutionsRqDto, JobExecution, JobProfileInfo};
use bibflow_common::types::{ErrorStatus, JobExecutionStatus};

/// Create job execution routes
pub fn job_executions_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", post(init).delete(soft_delete))
        .route("/:id", get(get_one).put(update))
        .route("/:id/status", put(put_status))
        .route("/:id/job-profile", put(put_job_profile))
        .route("/:id/records", delete(delete_job_records))
        .route("/:id/children", get(children))
}

/// POST /change-manager/job-executions
async fn init(
    State(state): State<FeatureState>,
    Json(request): Json<InitJobExecutionsRqDto>,
) -> Result<Response, AppError> {
    let response =
        init_job_executions::handle(&state.ctx, InitJobExecutionsCommand { request })
            .await
            .map_err(|e| match e {
                init_job_executions::InitJobExecutionsError::NoSource => {
                    AppError::BadRequest(e.to_string())
                },
                init_job_executions::InitJobExecutionsError::Store(err) => err.into(),
            })?;
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// GET /change-manager/job-executions/:id
async fn get_one(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobExecution>, AppError> {
    let job = get_job_execution::handle(&state.ctx, GetJobExecutionQuery { job_execution_id: id })
        .await
        .map_err(|e| match e {
            get_job_execution::GetJobExecutionError::JobNotFound(_) => {
                AppError::NotFound(e.to_string())
            },
            get_job_execution::GetJobExecutionError::Store(err) => err.into(),
        })?;
    Ok(Json(job))
}

/// PUT /change-manager/job-executions/:id
async fn update(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    Json(mut job_execution): Json<JobExecution>,
) -> Result<Json<JobExecution>, AppError> {
    job_execution.id = id;
    let job =
        update_job_execution::handle(&state.ctx, UpdateJobExecutionCommand { job_execution })
            .await
            .map_err(|e| match e {
                update_job_execution::UpdateJobExecutionError::JobNotFound(_) => {
                    AppError::NotFound(e.to_string())
                },
                update_job_execution::UpdateJobExecutionError::ImmutableField(_) => {
                    AppError::BadRequest(e.to_string())
                },
                update_job_execution::UpdateJobExecutionError::Store(err) => err.into(),
            })?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusDto {
    status: JobExecutionStatus,
    #[serde(default)]
    error_status: Option<ErrorStatus>,
}

/// PUT /change-manager/job-executions/:id/status
async fn put_status(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusDto>,
) -> Result<Json<JobExecution>, AppError> {
    let job = update_status::handle(
        &state.ctx,
        UpdateStatusCommand {
            job_execution_id: id,
            status: body.status,
            error_status: body.error_status,
        },
    )
    .await
    .map_err(|e| match e {
        update_status::UpdateStatusError::JobNotFound(_) => AppError::NotFound(e.to_string()),
        update_status::UpdateStatusError::ParentStatus
        | update_status::UpdateStatusError::InvalidTransition { .. } => {
            AppError::BadRequest(e.to_string())
        },
        update_status::UpdateStatusError::MissingParent(_) => AppError::Internal(e.to_string()),
        update_status::UpdateStatusError::Store(err) => err.into(),
    })?;
    Ok(Json(job))
}

/// PUT /change-manager/job-executions/:id/job-profile
async fn put_job_profile(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    Json(job_profile_info): Json<JobProfileInfo>,
) -> Result<Json<JobExecution>, AppError> {
    let job = set_job_profile::handle(
        &state.ctx,
        SetJobProfileCommand {
            job_execution_id: id,
            job_profile_info,
        },
    )
    .await
    .map_err(|e| match e {
        set_job_profile::SetJobProfileError::JobNotFound(_) => AppError::NotFound(e.to_string()),
        set_job_profile::SetJobProfileError::ProfileAlreadySet(_) => {
            AppError::BadRequest(e.to_string())
        },
        set_job_profile::SetJobProfileError::SnapshotResolution(_) => {
            AppError::Internal(e.to_string())
        },
        set_job_profile::SetJobProfileError::Store(err) => err.into(),
    })?;
    Ok(Json(job))
}

/// DELETE /change-manager/job-executions/:id/records
async fn delete_job_records(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_records::handle(&state.ctx, DeleteRecordsCommand { job_execution_id: id })
        .await
        .map_err(|e| match e {
            delete_records::DeleteRecordsError::JobNotFound(_) => {
                AppError::NotFound(e.to_string())
            },
            delete_records::DeleteRecordsError::AlreadyCommitted => {
                AppError::BadRequest(e.to_string())
            },
            delete_records::DeleteRecordsError::Store(err) => err.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SoftDeleteDto {
    ids: Vec<Uuid>,
}

/// DELETE /change-manager/job-executions
async fn soft_delete(
    State(state): State<FeatureState>,
    Json(body): Json<SoftDeleteDto>,
) -> Result<Response, AppError> {
    let response = soft_delete_job_executions::handle(
        &state.ctx,
        SoftDeleteJobExecutionsCommand { ids: body.ids },
    )
    .await
    .map_err(|e| match e {
        soft_delete_job_executions::SoftDeleteError::Empty => AppError::BadRequest(e.to_string()),
        soft_delete_job_executions::SoftDeleteError::Store(err) => err.into(),
    })?;
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// GET /change-manager/job-executions/:id/children?limit=&offset=
async fn children(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, AppError> {
    let response = list_children::handle(
        &state.ctx,
        ListChildrenQuery {
            parent_job_id: id,
            pagination,
        },
    )
    .await
    .map_err(|e| match e {
        list_children::ListChildrenError::Store(err) => AppError::from(err),
    })?;
    Ok((StatusCode::OK, Json(response)).into_response())
}
