//! Get log entries query
//!
//! The paginated per-record report of one job. Sorting and pagination
//! apply after grouping and deriving, since grouping must see the full
//! row set; totals always reflect the requested filter view.

use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

use super::super::reducer::{reduce, JobLogEntry};
use crate::features::shared::pagination::PaginationParams;
use crate::features::shared::sort::{validate_sort_field, SortOrder, SortValidationError};
use crate::storage::{AppContext, StoreError};
use bibflow_common::types::EntityType;

/// Fields clients may sort the report by
pub const SORTABLE_FIELDS: &[&str] = &["source_record_order", "action_status", "completed_date"];

/// Query for one job's processing log
#[derive(Debug, Clone)]
pub struct GetLogEntriesQuery {
    pub job_execution_id: Uuid,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub pagination: PaginationParams,
    pub errors_only: bool,
    pub entity_type: Option<String>,
}

/// One page of log entries plus the total of the requested view
#[derive(Debug, Clone, Serialize)]
pub struct LogEntriesResponse {
    pub entries: Vec<JobLogEntry>,
    pub total_records: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetLogEntriesError {
    /// Unknown sort field or order
    #[error(transparent)]
    InvalidSort(#[from] SortValidationError),

    /// The entityType filter names no known entity type
    #[error("The specified query parameter is not valid: entityType={0}")]
    InvalidEntityType(String),

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub async fn handle(
    ctx: &AppContext,
    query: GetLogEntriesQuery,
) -> Result<LogEntriesResponse, GetLogEntriesError> {
    let sort_by = query.sort_by.as_deref().unwrap_or("source_record_order");
    validate_sort_field(sort_by, SORTABLE_FIELDS)?;
    let order: SortOrder = match query.order.as_deref() {
        Some(raw) => raw.parse()?,
        None => SortOrder::Asc,
    };
    let entity_type = query
        .entity_type
        .as_deref()
        .map(|raw| {
            raw.parse::<EntityType>()
                .map_err(|_| GetLogEntriesError::InvalidEntityType(raw.to_string()))
        })
        .transpose()?;

    let rows = ctx.journal.by_job(query.job_execution_id).await?;
    let mut entries = reduce(&rows);

    if let Some(entity_type) = entity_type {
        entries.retain(|entry| entry.involves(entity_type));
    }
    if query.errors_only {
        entries.retain(JobLogEntry::has_error);
    }

    let total_records = entries.len() as i64;
    sort_entries(&mut entries, sort_by, order);

    let entries = entries
        .into_iter()
        .skip(query.pagination.offset() as usize)
        .take(query.pagination.limit() as usize)
        .collect();

    Ok(LogEntriesResponse {
        entries,
        total_records,
    })
}

fn sort_entries(entries: &mut [JobLogEntry], sort_by: &str, order: SortOrder) {
    let compare = |a: &JobLogEntry, b: &JobLogEntry| -> Ordering {
        match sort_by {
            "action_status" => {
                let key = |e: &JobLogEntry| {
                    e.source_record_action_status.map(|s| s.as_str()).unwrap_or("")
                };
                key(a).cmp(key(b))
            },
            "completed_date" => a.completed_date.cmp(&b.completed_date),
            // source_record_order, the default and only remaining field
            _ => (a.source_record_order, a.invoice_line_number)
                .cmp(&(b.source_record_order, b.invoice_line_number)),
        }
    };
    match order {
        SortOrder::Asc => entries.sort_by(compare),
        SortOrder::Desc => entries.sort_by(|a, b| compare(b, a)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::flow_control::FlowControlSettings;
    use crate::models::JournalRecord;
    use crate::storage::memory::InMemoryState;
    use bibflow_common::types::{ActionStatus, ActionType};
    use chrono::Utc;

    fn row(job_id: Uuid, order: i32, status: ActionStatus) -> JournalRecord {
        JournalRecord {
            id: Uuid::new_v4(),
            job_execution_id: job_id,
            source_id: Uuid::new_v4(),
            source_record_order: order,
            title: Some(format!("Record {order}")),
            entity_type: EntityType::MarcBibliographic,
            action_type: ActionType::Parse,
            action_status: status,
            error: None,
            action_date: Utc::now(),
            entity_id: None,
            entity_hrid: None,
            instance_id: None,
            holdings_id: None,
            permanent_location_id: None,
            order_id: None,
            tenant_id: "diku".to_string(),
        }
    }

    fn query(job_id: Uuid) -> GetLogEntriesQuery {
        GetLogEntriesQuery {
            job_execution_id: job_id,
            sort_by: None,
            order: None,
            pagination: PaginationParams::default(),
            errors_only: false,
            entity_type: None,
        }
    }

    #[tokio::test]
    async fn errors_only_totals_match_the_filtered_view() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let job_id = Uuid::new_v4();
        let mut rows = vec![];
        for order in 0..5 {
            rows.push(row(job_id, order, ActionStatus::Completed));
        }
        for order in 5..7 {
            rows.push(row(job_id, order, ActionStatus::Error));
        }
        ctx.journal.save_batch(&rows).await.unwrap();

        let all = handle(&ctx, query(job_id)).await.unwrap();
        assert_eq!(all.total_records, 7);

        let mut errors = query(job_id);
        errors.errors_only = true;
        let errors = handle(&ctx, errors).await.unwrap();
        assert_eq!(errors.total_records, 2);
        assert_eq!(errors.entries.len(), 2);
    }

    #[tokio::test]
    async fn unknown_sort_field_is_rejected() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let mut bad = query(Uuid::new_v4());
        bad.sort_by = Some("title".to_string());
        let result = handle(&ctx, bad).await;
        assert!(matches!(result, Err(GetLogEntriesError::InvalidSort(_))));
    }

    #[tokio::test]
    async fn descending_order_reverses_entries() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let job_id = Uuid::new_v4();
        let rows: Vec<_> = (0..3).map(|o| row(job_id, o, ActionStatus::Completed)).collect();
        ctx.journal.save_batch(&rows).await.unwrap();

        let mut desc = query(job_id);
        desc.order = Some("desc".to_string());
        let response = handle(&ctx, desc).await.unwrap();
        let orders: Vec<i32> = response.entries.iter().map(|e| e.source_record_order).collect();
        assert_eq!(orders, vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn entity_type_filter_can_return_empty_zero_total() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let job_id = Uuid::new_v4();
        ctx.journal
            .save_batch(&[row(job_id, 0, ActionStatus::Completed)])
            .await
            .unwrap();

        let mut filtered = query(job_id);
        filtered.entity_type = Some("INVOICE".to_string());
        let response = handle(&ctx, filtered).await.unwrap();
        assert!(response.entries.is_empty());
        assert_eq!(response.total_records, 0);
    }

    #[tokio::test]
    async fn pagination_applies_after_grouping() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let job_id = Uuid::new_v4();
        let rows: Vec<_> = (0..10).map(|o| row(job_id, o, ActionStatus::Completed)).collect();
        ctx.journal.save_batch(&rows).await.unwrap();

        let mut paged = query(job_id);
        paged.pagination = PaginationParams::new(Some(4), Some(4));
        let response = handle(&ctx, paged).await.unwrap();
        assert_eq!(response.total_records, 10);
        let orders: Vec<i32> = response.entries.iter().map(|e| e.source_record_order).collect();
        assert_eq!(orders, vec![4, 5, 6, 7]);
    }
}
