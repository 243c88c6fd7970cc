//! Journal report routes
//!
//! Mounted under `/metadata-provider/job-log-entries`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::queries::{
    get_log_entries, get_record_entry, GetLogEntriesQuery, GetRecordEntryQuery,
};
use crate::error::AppError;
use crate::features::shared::pagination::PaginationParams;
use crate::features::FeatureState;

/// Create journal report routes
pub fn journal_routes() -> Router<FeatureState> {
    Router::new()
        .route("/:job_id", get(log_entries))
        .route("/:job_id/records/:record_id", get(record_entry))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEntriesParams {
    sort_by: Option<String>,
    order: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    #[serde(default)]
    errors_only: bool,
    entity_type: Option<String>,
}

/// GET /metadata-provider/job-log-entries/:job_id
async fn log_entries(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<LogEntriesParams>,
) -> Result<Response, AppError> {
    let response = get_log_entries::handle(
        &state.ctx,
        GetLogEntriesQuery {
            job_execution_id: job_id,
            sort_by: params.sort_by,
            order: params.order,
            pagination: PaginationParams::new(params.limit, params.offset),
            errors_only: params.errors_only,
            entity_type: params.entity_type,
        },
    )
    .await
    .map_err(|e| match e {
        get_log_entries::GetLogEntriesError::InvalidSort(_)
        | get_log_entries::GetLogEntriesError::InvalidEntityType(_) => {
            AppError::BadRequest(e.to_string())
        },
        get_log_entries::GetLogEntriesError::Store(err) => err.into(),
    })?;
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// GET /metadata-provider/job-log-entries/:job_id/records/:record_id
async fn record_entry(
    State(state): State<FeatureState>,
    Path((job_id, record_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    let response = get_record_entry::handle(
        &state.ctx,
        GetRecordEntryQuery {
            job_execution_id: job_id,
            record_id,
        },
    )
    .await
    .map_err(|e| match e {
        get_record_entry::GetRecordEntryError::NotFound { .. } => {
            AppError::NotFound(e.to_string())
        },
        get_record_entry::GetRecordEntryError::Store(err) => err.into(),
    })?;
    Ok((StatusCode::OK, Json(response)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_build() {
        let _router = journal_routes();
    }
}
