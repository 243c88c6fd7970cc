//! Job execution lifecycle integration tests
//!
//! Composite-job initialization, the status machine, parent aggregation,
//! and soft deletion, all against the in-memory backends.

mod common;

use bibflow_common::types::{JobExecutionStatus, SubordinationType};
use bibflow_server::features::job_executions::commands::{
    init_job_executions, soft_delete_job_executions, update_status, InitJobExecutionsCommand,
    SoftDeleteJobExecutionsCommand, UpdateStatusCommand,
};
use bibflow_server::features::job_executions::queries::{list_children, ListChildrenQuery};
use bibflow_server::features::shared::pagination::PaginationParams;
use uuid::Uuid;

use common::{init_files, setup};

fn status_command(id: Uuid, status: JobExecutionStatus) -> UpdateStatusCommand {
    UpdateStatusCommand {
        job_execution_id: id,
        status,
        error_status: None,
    }
}

#[tokio::test]
async fn single_file_init_yields_one_parent_single_job() {
    let (_state, ctx) = setup();

    let response = init_job_executions::handle(
        &ctx,
        InitJobExecutionsCommand { request: init_files(&["records.mrc"]) },
    )
    .await
    .unwrap();

    assert_eq!(response.job_executions.len(), 1);
    let job = &response.job_executions[0];
    assert_eq!(job.subordination_type, SubordinationType::ParentSingle);
    assert_eq!(job.status, JobExecutionStatus::New);
    assert_eq!(job.parent_job_id, job.id);
    assert_eq!(job.file_name.as_deref(), Some("records.mrc"));
    assert_eq!(response.parent_job_execution_id, job.id);
}

#[tokio::test]
async fn twenty_five_files_yield_umbrella_parent_plus_children() {
    let (_state, ctx) = setup();
    let names: Vec<String> = (1..=25).map(|i| format!("part-{i:02}.mrc")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let response = init_job_executions::handle(
        &ctx,
        InitJobExecutionsCommand { request: init_files(&name_refs) },
    )
    .await
    .unwrap();

    assert_eq!(response.job_executions.len(), 26);
    let parent = &response.job_executions[0];
    assert_eq!(parent.subordination_type, SubordinationType::ParentMultiple);
    assert_eq!(parent.status, JobExecutionStatus::Parent);
    assert!(parent.file_name.is_none());

    // hr_ids are sequential across the whole batch
    let hr_ids: Vec<i32> = response.job_executions.iter().map(|j| j.hr_id).collect();
    let expected: Vec<i32> = (hr_ids[0]..hr_ids[0] + 26).collect();
    assert_eq!(hr_ids, expected);

    let page = list_children::handle(
        &ctx,
        ListChildrenQuery {
            parent_job_id: parent.id,
            pagination: PaginationParams::new(Some(15), Some(0)),
        },
    )
    .await
    .unwrap();
    assert_eq!(page.job_executions.len(), 15);
    assert_eq!(page.total_records, 25);
    assert!(page
        .job_executions
        .iter()
        .all(|c| c.subordination_type == SubordinationType::Child && c.parent_job_id == parent.id));
}

#[tokio::test]
async fn child_completion_drives_parent_to_committed() {
    let (_state, ctx) = setup();
    let response = init_job_executions::handle(
        &ctx,
        InitJobExecutionsCommand { request: init_files(&["a.mrc", "b.mrc"]) },
    )
    .await
    .unwrap();
    let parent_id = response.parent_job_execution_id;
    let children: Vec<Uuid> = response.job_executions[1..].iter().map(|j| j.id).collect();

    // Walk each child through the full forward chain
    let chain = [
        JobExecutionStatus::ParsingInProgress,
        JobExecutionStatus::ParsingFinished,
        JobExecutionStatus::ProcessingInProgress,
        JobExecutionStatus::ProcessingFinished,
        JobExecutionStatus::Committed,
    ];
    for status in chain {
        update_status::handle(&ctx, status_command(children[0], status)).await.unwrap();
    }

    let parent = ctx.job_executions.get(parent_id).await.unwrap().unwrap();
    assert_eq!(parent.status, JobExecutionStatus::Parent, "one child still pending");

    for status in chain {
        update_status::handle(&ctx, status_command(children[1], status)).await.unwrap();
    }

    let parent = ctx.job_executions.get(parent_id).await.unwrap().unwrap();
    assert_eq!(parent.status, JobExecutionStatus::Committed);
    assert!(parent.completed_date.is_some());
}

#[tokio::test]
async fn skipping_ahead_in_the_status_machine_is_rejected() {
    let (_state, ctx) = setup();
    let response = init_job_executions::handle(
        &ctx,
        InitJobExecutionsCommand { request: init_files(&["records.mrc"]) },
    )
    .await
    .unwrap();
    let job_id = response.parent_job_execution_id;

    let result =
        update_status::handle(&ctx, status_command(job_id, JobExecutionStatus::Committed)).await;
    assert!(matches!(
        result,
        Err(update_status::UpdateStatusError::InvalidTransition { .. })
    ));

    // The reserved PARENT status is never a legal target
    let result =
        update_status::handle(&ctx, status_command(job_id, JobExecutionStatus::Parent)).await;
    assert!(matches!(result, Err(update_status::UpdateStatusError::ParentStatus)));
}

#[tokio::test]
async fn soft_deleted_jobs_vanish_from_reads() {
    let (state, ctx) = setup();
    let response = init_job_executions::handle(
        &ctx,
        InitJobExecutionsCommand { request: init_files(&["records.mrc"]) },
    )
    .await
    .unwrap();
    let job_id = response.parent_job_execution_id;
    let missing = Uuid::new_v4();

    let outcome = soft_delete_job_executions::handle(
        &ctx,
        SoftDeleteJobExecutionsCommand { ids: vec![job_id, missing] },
    )
    .await
    .unwrap();

    let deleted: Vec<_> = outcome
        .job_execution_details
        .iter()
        .filter(|d| d.is_deleted)
        .map(|d| d.id)
        .collect();
    assert_eq!(deleted, vec![job_id]);

    // Hidden from normal reads, but the row itself survives
    assert!(ctx.job_executions.get(job_id).await.unwrap().is_none());
    assert!(state.job_executions.raw_get(job_id).is_some());

    let result =
        update_status::handle(&ctx, status_command(job_id, JobExecutionStatus::ParsingInProgress))
            .await;
    assert!(matches!(result, Err(update_status::UpdateStatusError::JobNotFound(_))));
}
