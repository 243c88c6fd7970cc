//! Source chunk rows

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::backend;
use crate::models::{ChunkState, JobExecutionSourceChunk};
use crate::storage::{ChunkCompletionState, SourceChunkStore, StoreError, StoreResult};

pub struct PgSourceChunkStore {
    pool: PgPool,
}

impl PgSourceChunkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceChunkStore for PgSourceChunkStore {
    async fn save(&self, chunk: &JobExecutionSourceChunk) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO job_execution_source_chunks
                (id, job_execution_id, chunk_size, records_counter, last, state,
                 created_date, completed_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(chunk.id)
        .bind(chunk.job_execution_id)
        .bind(chunk.chunk_size)
        .bind(chunk.records_counter)
        .bind(chunk.last)
        .bind(chunk.state.as_str())
        .bind(chunk.created_date)
        .bind(chunk.completed_date)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn complete(
        &self,
        chunk_id: Uuid,
        state: ChunkState,
        completed_date: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE job_execution_source_chunks SET state = $2, completed_date = $3 WHERE id = $1",
        )
        .bind(chunk_id)
        .bind(state.as_str())
        .bind(completed_date)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("JobExecutionSourceChunk", chunk_id));
        }
        Ok(())
    }

    async fn completion_state(&self, job_execution_id: Uuid) -> StoreResult<ChunkCompletionState> {
        let row: (Option<bool>, Option<bool>, Option<bool>, Option<i64>, Option<i64>) =
            sqlx::query_as(
                r#"
                SELECT bool_or(last),
                       bool_or(state = 'IN_PROGRESS'),
                       bool_or(state = 'ERROR'),
                       sum(chunk_size)::BIGINT,
                       (max(records_counter) FILTER (WHERE last))::BIGINT
                FROM job_execution_source_chunks
                WHERE job_execution_id = $1
                "#,
            )
            .bind(job_execution_id)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        Ok(ChunkCompletionState {
            has_last: row.0.unwrap_or(false),
            any_in_progress: row.1.unwrap_or(false),
            any_error: row.2.unwrap_or(false),
            received_records: row.3.unwrap_or(0),
            last_counter: row.4,
        })
    }
}
