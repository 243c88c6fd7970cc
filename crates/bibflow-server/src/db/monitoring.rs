//! Heartbeat rows for the stall watchdog

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::backend;
use crate::storage::{MonitoringStore, StoreResult};

pub struct PgMonitoringStore {
    pool: PgPool,
}

impl PgMonitoringStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MonitoringStore for PgMonitoringStore {
    async fn touch(&self, job_execution_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        // Any activity resets the notification flag so a recovered job can
        // alert again if it stalls later
        sqlx::query(
            r#"
            INSERT INTO job_monitoring (job_execution_id, last_event_timestamp, notification_sent)
            VALUES ($1, $2, FALSE)
            ON CONFLICT (job_execution_id) DO UPDATE SET
                last_event_timestamp = EXCLUDED.last_event_timestamp,
                notification_sent = FALSE
            "#,
        )
        .bind(job_execution_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}
