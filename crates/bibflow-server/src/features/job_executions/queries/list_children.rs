//! List children query
//!
//! Paginated CHILD jobs of a PARENT_MULTIPLE job, ordered by hr_id, with
//! the unpaginated total so the client can page through all of them.

use serde::Serialize;
use uuid::Uuid;

use crate::features::shared::pagination::PaginationParams;
use crate::models::JobExecution;
use crate::storage::{AppContext, StoreError};

/// Query for the children of a parent job
#[derive(Debug, Clone, Copy)]
pub struct ListChildrenQuery {
    pub parent_job_id: Uuid,
    pub pagination: PaginationParams,
}

/// One page of children plus the total
#[derive(Debug, Clone, Serialize)]
pub struct ListChildrenResponse {
    pub job_executions: Vec<JobExecution>,
    pub total_records: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ListChildrenError {
    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub async fn handle(
    ctx: &AppContext,
    query: ListChildrenQuery,
) -> Result<ListChildrenResponse, ListChildrenError> {
    let (job_executions, total_records) = ctx
        .job_executions
        .children(query.parent_job_id, query.pagination.limit(), query.pagination.offset())
        .await?;
    Ok(ListChildrenResponse {
        job_executions,
        total_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::flow_control::FlowControlSettings;
    use crate::models::test_util::test_job;
    use crate::storage::memory::InMemoryState;
    use bibflow_common::types::SubordinationType;

    #[tokio::test]
    async fn limit_fifteen_of_twenty_five() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let parent_id = Uuid::new_v4();
        for hr_id in 1..=25 {
            let mut child = test_job();
            child.hr_id = hr_id;
            child.parent_job_id = parent_id;
            child.subordination_type = SubordinationType::Child;
            ctx.job_executions.save(&child).await.unwrap();
        }

        let page = handle(
            &ctx,
            ListChildrenQuery {
                parent_job_id: parent_id,
                pagination: PaginationParams::new(Some(15), Some(0)),
            },
        )
        .await
        .unwrap();

        assert_eq!(page.job_executions.len(), 15);
        assert_eq!(page.total_records, 25);

        let rest = handle(
            &ctx,
            ListChildrenQuery {
                parent_job_id: parent_id,
                pagination: PaginationParams::new(Some(15), Some(15)),
            },
        )
        .await
        .unwrap();
        assert_eq!(rest.job_executions.len(), 10);
        assert_eq!(rest.total_records, 25);
    }

    #[tokio::test]
    async fn unknown_parent_yields_empty_page() {
        let ctx = InMemoryState::new().context(FlowControlSettings::default());
        let page = handle(
            &ctx,
            ListChildrenQuery {
                parent_job_id: Uuid::new_v4(),
                pagination: PaginationParams::default(),
            },
        )
        .await
        .unwrap();
        assert!(page.job_executions.is_empty());
        assert_eq!(page.total_records, 0);
    }
}
