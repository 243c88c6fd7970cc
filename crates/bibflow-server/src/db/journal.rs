//! Journal rows
//!
//! Append-only; rows are written in batches inside one transaction and
//! never updated afterward.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{backend, decode};
use crate::models::JournalRecord;
use crate::storage::{JournalStore, StoreResult};

pub struct PgJournalStore {
    pool: PgPool,
}

impl PgJournalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct JournalRow {
    id: Uuid,
    job_execution_id: Uuid,
    source_id: Uuid,
    source_record_order: i32,
    title: Option<String>,
    entity_type: String,
    action_type: String,
    action_status: String,
    error: Option<String>,
    action_date: DateTime<Utc>,
    entity_id: Option<String>,
    entity_hrid: Option<String>,
    instance_id: Option<String>,
    holdings_id: Option<String>,
    permanent_location_id: Option<String>,
    order_id: Option<String>,
    tenant_id: String,
}

impl JournalRow {
    fn into_domain(self) -> StoreResult<JournalRecord> {
        Ok(JournalRecord {
            id: self.id,
            job_execution_id: self.job_execution_id,
            source_id: self.source_id,
            source_record_order: self.source_record_order,
            title: self.title,
            entity_type: decode("entity_type", &self.entity_type)?,
            action_type: decode("action_type", &self.action_type)?,
            action_status: decode("action_status", &self.action_status)?,
            error: self.error,
            action_date: self.action_date,
            entity_id: self.entity_id,
            entity_hrid: self.entity_hrid,
            instance_id: self.instance_id,
            holdings_id: self.holdings_id,
            permanent_location_id: self.permanent_location_id,
            order_id: self.order_id,
            tenant_id: self.tenant_id,
        })
    }
}

const SELECT_COLUMNS: &str = "id, job_execution_id, source_id, source_record_order, title, \
     entity_type, action_type, action_status, error, action_date, entity_id, entity_hrid, \
     instance_id, holdings_id, permanent_location_id, order_id, tenant_id";

#[async_trait]
impl JournalStore for PgJournalStore {
    async fn save_batch(&self, records: &[JournalRecord]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO journal_records (
                    id, job_execution_id, source_id, source_record_order, title,
                    entity_type, action_type, action_status, error, action_date,
                    entity_id, entity_hrid, instance_id, holdings_id,
                    permanent_location_id, order_id, tenant_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                        $17)
                "#,
            )
            .bind(record.id)
            .bind(record.job_execution_id)
            .bind(record.source_id)
            .bind(record.source_record_order)
            .bind(&record.title)
            .bind(record.entity_type.as_str())
            .bind(record.action_type.as_str())
            .bind(record.action_status.as_str())
            .bind(&record.error)
            .bind(record.action_date)
            .bind(&record.entity_id)
            .bind(&record.entity_hrid)
            .bind(&record.instance_id)
            .bind(&record.holdings_id)
            .bind(&record.permanent_location_id)
            .bind(&record.order_id)
            .bind(&record.tenant_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn by_job(&self, job_execution_id: Uuid) -> StoreResult<Vec<JournalRecord>> {
        let rows: Vec<JournalRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM journal_records WHERE job_execution_id = $1"
        ))
        .bind(job_execution_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(JournalRow::into_domain).collect()
    }

    async fn by_job_and_source(
        &self,
        job_execution_id: Uuid,
        source_id: Uuid,
    ) -> StoreResult<Vec<JournalRecord>> {
        let rows: Vec<JournalRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM journal_records \
             WHERE job_execution_id = $1 AND source_id = $2"
        ))
        .bind(job_execution_id)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(JournalRow::into_domain).collect()
    }
}
