//! Chunk submission routes
//!
//! Mounted under `/change-manager/job-executions` next to the lifecycle
//! routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use super::commands::{process_chunk, ProcessChunkCommand};
use crate::error::AppError;
use crate::features::FeatureState;
use crate::models::RawRecordsDto;

/// Create chunk routes
pub fn chunks_routes() -> Router<FeatureState> {
    Router::new().route("/:id/records", post(submit_records))
}

/// POST /change-manager/job-executions/:id/records
///
/// 204 on success, 404 for an unknown job, 500 when the chunk snapshot
/// cannot be persisted or the outbound channel is unreachable.
async fn submit_records(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
    Json(chunk): Json<RawRecordsDto>,
) -> Result<StatusCode, AppError> {
    process_chunk::handle(
        &state.ctx,
        ProcessChunkCommand {
            job_execution_id: id,
            chunk,
        },
    )
    .await
    .map_err(|e| match e {
        process_chunk::ProcessChunkError::JobNotFound(_) => AppError::NotFound(e.to_string()),
        process_chunk::ProcessChunkError::JobFinished(_, _)
        | process_chunk::ProcessChunkError::ParentJob(_) => AppError::BadRequest(e.to_string()),
        process_chunk::ProcessChunkError::ChunkPersistence(_)
        | process_chunk::ProcessChunkError::Engine(_) => AppError::Internal(e.to_string()),
        process_chunk::ProcessChunkError::Store(err) => err.into(),
    })?;
    Ok(StatusCode::NO_CONTENT)
}
