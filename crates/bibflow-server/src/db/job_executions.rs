//! Job execution rows
//!
//! Status and type columns are stored as text in their wire spelling;
//! nested objects (profile info, progress, run-by) live in jsonb columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{backend, decode};
use crate::models::JobExecution;
use crate::storage::{JobExecutionStore, StoreError, StoreResult};

pub struct PgJobExecutionStore {
    pool: PgPool,
}

impl PgJobExecutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct JobExecutionRow {
    id: Uuid,
    hr_id: i32,
    parent_job_id: Uuid,
    subordination_type: String,
    status: String,
    ui_status: String,
    error_status: Option<String>,
    job_profile_info: Option<serde_json::Value>,
    profile_snapshot_id: Option<Uuid>,
    profile_snapshot_creates_instance: bool,
    progress: serde_json::Value,
    run_by: serde_json::Value,
    user_id: Uuid,
    source_path: Option<String>,
    file_name: Option<String>,
    started_date: DateTime<Utc>,
    completed_date: Option<DateTime<Utc>>,
    deleted: bool,
    tenant_id: String,
}

impl JobExecutionRow {
    fn into_domain(self) -> StoreResult<JobExecution> {
        let job_profile_info = self
            .job_profile_info
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("undecodable job_profile_info: {e}")))?;
        let progress = serde_json::from_value(self.progress)
            .map_err(|e| StoreError::Backend(format!("undecodable progress: {e}")))?;
        let run_by = serde_json::from_value(self.run_by)
            .map_err(|e| StoreError::Backend(format!("undecodable run_by: {e}")))?;

        Ok(JobExecution {
            id: self.id,
            hr_id: self.hr_id,
            parent_job_id: self.parent_job_id,
            subordination_type: decode("subordination_type", &self.subordination_type)?,
            status: decode("status", &self.status)?,
            ui_status: decode("ui_status", &self.ui_status)?,
            error_status: self
                .error_status
                .as_deref()
                .map(|s| decode("error_status", s))
                .transpose()?,
            job_profile_info,
            profile_snapshot_id: self.profile_snapshot_id,
            profile_snapshot_creates_instance: self.profile_snapshot_creates_instance,
            progress,
            run_by,
            user_id: self.user_id,
            source_path: self.source_path,
            file_name: self.file_name,
            started_date: self.started_date,
            completed_date: self.completed_date,
            deleted: self.deleted,
            tenant_id: self.tenant_id,
        })
    }
}

const SELECT_COLUMNS: &str = "id, hr_id, parent_job_id, subordination_type, status, ui_status, \
     error_status, job_profile_info, profile_snapshot_id, profile_snapshot_creates_instance, \
     progress, run_by, user_id, source_path, file_name, started_date, completed_date, deleted, \
     tenant_id";

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> StoreResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::Backend(format!("unserializable {what}: {e}")))
}

#[async_trait]
impl JobExecutionStore for PgJobExecutionStore {
    async fn save(&self, job: &JobExecution) -> StoreResult<()> {
        let job_profile_info =
            job.job_profile_info.as_ref().map(|p| to_json(p, "job_profile_info")).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO job_executions (
                id, hr_id, parent_job_id, subordination_type, status, ui_status,
                error_status, job_profile_info, profile_snapshot_id,
                profile_snapshot_creates_instance, progress, run_by, user_id,
                source_path, file_name, started_date, completed_date, deleted, tenant_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                ui_status = EXCLUDED.ui_status,
                error_status = EXCLUDED.error_status,
                job_profile_info = EXCLUDED.job_profile_info,
                profile_snapshot_id = EXCLUDED.profile_snapshot_id,
                profile_snapshot_creates_instance = EXCLUDED.profile_snapshot_creates_instance,
                progress = EXCLUDED.progress,
                completed_date = EXCLUDED.completed_date,
                deleted = EXCLUDED.deleted
            "#,
        )
        .bind(job.id)
        .bind(job.hr_id)
        .bind(job.parent_job_id)
        .bind(job.subordination_type.as_str())
        .bind(job.status.as_str())
        .bind(job.ui_status.as_str())
        .bind(job.error_status.as_ref().map(|s| s.as_str()))
        .bind(job_profile_info)
        .bind(job.profile_snapshot_id)
        .bind(job.profile_snapshot_creates_instance)
        .bind(to_json(&job.progress, "progress")?)
        .bind(to_json(&job.run_by, "run_by")?)
        .bind(job.user_id)
        .bind(&job.source_path)
        .bind(&job.file_name)
        .bind(job.started_date)
        .bind(job.completed_date)
        .bind(job.deleted)
        .bind(&job.tenant_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<JobExecution>> {
        let row: Option<JobExecutionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM job_executions WHERE id = $1 AND NOT deleted"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(JobExecutionRow::into_domain).transpose()
    }

    async fn update(&self, job: &JobExecution) -> StoreResult<()> {
        let job_profile_info =
            job.job_profile_info.as_ref().map(|p| to_json(p, "job_profile_info")).transpose()?;
        let result = sqlx::query(
            r#"
            UPDATE job_executions SET
                status = $2,
                ui_status = $3,
                error_status = $4,
                job_profile_info = $5,
                profile_snapshot_id = $6,
                profile_snapshot_creates_instance = $7,
                progress = $8,
                completed_date = $9
            WHERE id = $1 AND NOT deleted
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(job.ui_status.as_str())
        .bind(job.error_status.as_ref().map(|s| s.as_str()))
        .bind(job_profile_info)
        .bind(job.profile_snapshot_id)
        .bind(job.profile_snapshot_creates_instance)
        .bind(to_json(&job.progress, "progress")?)
        .bind(job.completed_date)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("JobExecution", job.id));
        }
        Ok(())
    }

    async fn next_hr_ids(&self, count: usize) -> StoreResult<Vec<i32>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT nextval('job_execution_hr_id_seq') FROM generate_series(1, $1)",
        )
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(|(v,)| v as i32).collect())
    }

    async fn children(
        &self,
        parent_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<JobExecution>, i64)> {
        let rows: Vec<JobExecutionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM job_executions \
             WHERE parent_job_id = $1 AND id <> $1 AND NOT deleted \
             ORDER BY hr_id LIMIT $2 OFFSET $3"
        ))
        .bind(parent_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM job_executions \
             WHERE parent_job_id = $1 AND id <> $1 AND NOT deleted",
        )
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let jobs = rows
            .into_iter()
            .map(JobExecutionRow::into_domain)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((jobs, total))
    }

    async fn soft_delete(&self, ids: &[Uuid]) -> StoreResult<Vec<(Uuid, bool)>> {
        let deleted: Vec<(Uuid,)> = sqlx::query_as(
            "UPDATE job_executions SET deleted = TRUE \
             WHERE id = ANY($1) AND NOT deleted RETURNING id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let deleted: std::collections::HashSet<Uuid> =
            deleted.into_iter().map(|(id,)| id).collect();
        Ok(ids.iter().map(|id| (*id, deleted.contains(id))).collect())
    }
}
