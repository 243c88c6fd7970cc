//! Feature modules implementing the bibflow API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes:
//!
//! - **job_executions**: job lifecycle (init, status, profile, deletion)
//! - **chunks**: raw record chunk submission into the change engine
//! - **journal**: journal writes and the per-record processing reports
//!
//! Commands and queries live in per-operation files, each exporting a
//! request struct, an error enum, and a `handle` function; `routes.rs`
//! maps them onto HTTP.

pub mod chunks;
pub mod job_executions;
pub mod journal;
pub mod shared;

use axum::Router;

use crate::storage::AppContext;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Storage backends, outbound clients, and flow control
    pub ctx: AppContext,
}

/// Creates the main API router with all feature routes mounted
///
/// Lifecycle and chunk routes share the `/change-manager/job-executions`
/// prefix; the report routes live under
/// `/metadata-provider/job-log-entries`.
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest(
            "/change-manager/job-executions",
            job_executions::job_executions_routes().merge(chunks::chunks_routes()),
        )
        .nest(
            "/metadata-provider/job-log-entries",
            journal::journal_routes(),
        )
        .with_state(state)
}
