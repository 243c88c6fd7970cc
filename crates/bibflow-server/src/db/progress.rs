//! Progress counter rows

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::backend;
use crate::models::JobExecutionProgress;
use crate::storage::{ProgressStore, StoreError, StoreResult};

pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    job_execution_id: Uuid,
    expected_total: i32,
    succeeded: i32,
    failed: i32,
}

impl From<ProgressRow> for JobExecutionProgress {
    fn from(row: ProgressRow) -> Self {
        Self {
            job_execution_id: row.job_execution_id,
            expected_total: row.expected_total,
            succeeded: row.succeeded,
            failed: row.failed,
        }
    }
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn initialize(&self, job_execution_id: Uuid, expected_total: i32) -> StoreResult<()> {
        // First chunk wins; later totals are ignored
        sqlx::query(
            r#"
            INSERT INTO job_execution_progress (job_execution_id, expected_total, succeeded, failed)
            VALUES ($1, $2, 0, 0)
            ON CONFLICT (job_execution_id) DO NOTHING
            "#,
        )
        .bind(job_execution_id)
        .bind(expected_total)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn increment(
        &self,
        job_execution_id: Uuid,
        succeeded_delta: i32,
        failed_delta: i32,
    ) -> StoreResult<JobExecutionProgress> {
        let row: Option<ProgressRow> = sqlx::query_as(
            r#"
            UPDATE job_execution_progress
            SET succeeded = succeeded + $2, failed = failed + $3
            WHERE job_execution_id = $1
            RETURNING job_execution_id, expected_total, succeeded, failed
            "#,
        )
        .bind(job_execution_id)
        .bind(succeeded_delta)
        .bind(failed_delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Into::into)
            .ok_or_else(|| StoreError::not_found("JobExecutionProgress", job_execution_id))
    }

    async fn get(&self, job_execution_id: Uuid) -> StoreResult<Option<JobExecutionProgress>> {
        let row: Option<ProgressRow> = sqlx::query_as(
            "SELECT job_execution_id, expected_total, succeeded, failed \
             FROM job_execution_progress WHERE job_execution_id = $1",
        )
        .bind(job_execution_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Into::into))
    }
}
