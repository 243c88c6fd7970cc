//! Journal report integration tests
//!
//! Drive a chunk through the change engine, append the downstream
//! outcomes the way the handlers would, and check the reconstructed
//! per-record report.

mod common;

use bibflow_common::types::{ActionStatus, ActionType, EntityType, JobExecutionStatus};
use bibflow_server::engine::events::RecordChannel;
use bibflow_server::features::chunks::commands::{process_chunk, ProcessChunkCommand};
use bibflow_server::features::job_executions::commands::{
    init_job_executions, InitJobExecutionsCommand,
};
use bibflow_server::features::journal::commands::{
    write_journal_records, WriteJournalRecordsCommand,
};
use bibflow_server::features::journal::queries::{
    get_log_entries, get_record_entry, GetLogEntriesQuery, GetRecordEntryQuery,
};
use bibflow_server::features::journal::reducer::ProcessingStatus;
use bibflow_server::features::shared::pagination::PaginationParams;
use bibflow_server::models::JournalRecord;
use chrono::Utc;
use uuid::Uuid;

use common::{broken_record, chunk, init_files, marc_bib, setup};

fn report_query(job_id: Uuid) -> GetLogEntriesQuery {
    GetLogEntriesQuery {
        job_execution_id: job_id,
        sort_by: None,
        order: None,
        pagination: PaginationParams::default(),
        errors_only: false,
        entity_type: None,
    }
}

fn outcome_row(
    job_id: Uuid,
    source_id: Uuid,
    order: i32,
    entity_type: EntityType,
    action_status: ActionStatus,
    error: Option<&str>,
) -> JournalRecord {
    JournalRecord {
        id: Uuid::new_v4(),
        job_execution_id: job_id,
        source_id,
        source_record_order: order,
        title: None,
        entity_type,
        action_type: ActionType::Create,
        action_status,
        error: error.map(str::to_string),
        action_date: Utc::now(),
        entity_id: Some(Uuid::new_v4().to_string()),
        entity_hrid: None,
        instance_id: None,
        holdings_id: None,
        permanent_location_id: None,
        order_id: None,
        tenant_id: "diku".to_string(),
    }
}

#[tokio::test]
async fn report_reconstructs_per_record_outcomes() {
    let (state, ctx) = setup();
    let response = init_job_executions::handle(
        &ctx,
        InitJobExecutionsCommand { request: init_files(&["records.mrc"]) },
    )
    .await
    .unwrap();
    let job_id = response.parent_job_execution_id;

    // Two parseable records and one the parser rejects
    let records = vec![marc_bib("Good One"), marc_bib("Good Two"), broken_record()];
    let outcome = process_chunk::handle(
        &ctx,
        ProcessChunkCommand { job_execution_id: job_id, chunk: chunk(records, 3, 3, true) },
    )
    .await
    .unwrap();
    assert_eq!(outcome.classified, 2);
    assert_eq!(outcome.errored, 1);

    // Downstream handlers report one instance outcome per classified record:
    // the first succeeds, the second fails mapping
    // The error record also produced an event, on the error channel
    let events = state.publisher.events();
    assert_eq!(events.len(), 3);
    let classified: Vec<_> = events
        .iter()
        .filter(|e| e.channel != RecordChannel::Error)
        .collect();
    assert_eq!(classified.len(), 2);
    let succeeded = classified[0];
    let failed = classified[1];
    write_journal_records::handle(
        &ctx,
        WriteJournalRecordsCommand {
            records: vec![
                outcome_row(
                    job_id,
                    succeeded.incoming_record_id,
                    succeeded.payload.order,
                    EntityType::Instance,
                    ActionStatus::Completed,
                    None,
                ),
                outcome_row(
                    job_id,
                    failed.incoming_record_id,
                    failed.payload.order,
                    EntityType::Instance,
                    ActionStatus::Error,
                    Some("mapping failed"),
                ),
            ],
        },
    )
    .await
    .unwrap();

    // Full report: one entry per incoming record, in source order
    let report = get_log_entries::handle(&ctx, report_query(job_id)).await.unwrap();
    assert_eq!(report.total_records, 3);
    let orders: Vec<i32> = report.entries.iter().map(|e| e.source_record_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    let first = &report.entries[0];
    assert_eq!(first.source_record_title.as_deref(), Some("Good One"));
    assert_eq!(first.source_record_action_status, Some(ProcessingStatus::Created));
    assert_eq!(first.related_entities.len(), 1);
    assert_eq!(first.related_entities[0].action_status, ProcessingStatus::Created);

    let second = &report.entries[1];
    assert_eq!(second.related_entities[0].action_status, ProcessingStatus::Discarded);
    assert_eq!(second.error.as_deref(), Some("mapping failed"));

    let third = &report.entries[2];
    assert_eq!(third.source_record_action_status, Some(ProcessingStatus::Discarded));
    assert!(third.error.is_some());

    // Errors-only view keeps exactly the two failing records
    let mut errors_only = report_query(job_id);
    errors_only.errors_only = true;
    let errors = get_log_entries::handle(&ctx, errors_only).await.unwrap();
    assert_eq!(errors.total_records, 2);

    // Progress advanced only for the downstream outcomes
    let progress = ctx.progress.get(job_id).await.unwrap().unwrap();
    assert_eq!(progress.succeeded, 1);
    assert_eq!(progress.failed, 1);
}

#[tokio::test]
async fn record_level_view_returns_only_that_record() {
    let (state, ctx) = setup();
    let response = init_job_executions::handle(
        &ctx,
        InitJobExecutionsCommand { request: init_files(&["records.mrc"]) },
    )
    .await
    .unwrap();
    let job_id = response.parent_job_execution_id;

    process_chunk::handle(
        &ctx,
        ProcessChunkCommand {
            job_execution_id: job_id,
            chunk: chunk(vec![marc_bib("Alpha"), marc_bib("Beta")], 2, 2, true),
        },
    )
    .await
    .unwrap();
    let stored = ctx.job_executions.get(job_id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobExecutionStatus::ParsingFinished);

    let events = state.publisher.events();
    let target = events[0].incoming_record_id;

    let entry = get_record_entry::handle(
        &ctx,
        GetRecordEntryQuery { job_execution_id: job_id, record_id: target },
    )
    .await
    .unwrap();
    assert_eq!(entry.entries.len(), 1);
    assert_eq!(entry.entries[0].source_record_id, target);

    let missing = get_record_entry::handle(
        &ctx,
        GetRecordEntryQuery { job_execution_id: job_id, record_id: Uuid::new_v4() },
    )
    .await;
    assert!(matches!(
        missing,
        Err(get_record_entry::GetRecordEntryError::NotFound { .. })
    ));
}
