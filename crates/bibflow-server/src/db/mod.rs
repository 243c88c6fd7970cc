//! Postgres bindings for the storage contracts
//!
//! One file per aggregate. All queries are runtime-checked so the crate
//! builds without a live database; schema lives under `migrations/` at
//! the workspace root.

pub mod chunks;
pub mod job_executions;
pub mod journal;
pub mod monitoring;
pub mod progress;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, DatabaseConfig};
use crate::engine::flow_control::RawRecordsFlowControl;
use crate::engine::mapping_cache::MappingMetadataCache;
use crate::storage::memory::{
    InMemoryProfileSnapshotClient, InMemorySnapshotClient, StaticMappingMetadataProvider,
    TracingRecordPublisher,
};
use crate::storage::{AppContext, StoreError};

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Database configuration is invalid or missing
    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),

    /// Requested record does not exist
    #[error("{0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(message) => StoreError::NotFound(message),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Shorthand used by every Pg store for plain query failures
pub(crate) fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("Database query failed: {err}"))
}

/// Stored rows carry status/type columns as text; a value this code did
/// not write means the schema and binary are out of step
pub(crate) fn decode<T>(kind: &str, value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| StoreError::Backend(format!("undecodable {kind} column: {e}")))
}

pub async fn create_pool(config: &DatabaseConfig) -> DbResult<PgPool> {
    if config.url.is_empty() {
        return Err(DbError::Config("DATABASE_URL not set".to_string()));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}

/// Production wiring: Postgres stores, stand-in external collaborators
pub async fn build_context(config: &Config) -> anyhow::Result<AppContext> {
    let pool = create_pool(&config.database).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    Ok(AppContext {
        job_executions: Arc::new(job_executions::PgJobExecutionStore::new(pool.clone())),
        chunks: Arc::new(chunks::PgSourceChunkStore::new(pool.clone())),
        journal: Arc::new(journal::PgJournalStore::new(pool.clone())),
        progress: Arc::new(progress::PgProgressStore::new(pool.clone())),
        monitoring: Arc::new(monitoring::PgMonitoringStore::new(pool)),
        profile_snapshots: Arc::new(InMemoryProfileSnapshotClient::new()),
        snapshots: Arc::new(InMemorySnapshotClient::new()),
        publisher: Arc::new(TracingRecordPublisher),
        mapping_metadata: Arc::new(MappingMetadataCache::new(Arc::new(
            StaticMappingMetadataProvider,
        ))),
        flow_control: Arc::new(RawRecordsFlowControl::new(config.flow_control.settings())),
    })
}
