//! End-to-end pipeline tests over the in-memory backends
//!
//! Exercise init -> chunk submission -> change engine -> completion
//! detection, including out-of-order chunk arrival.

mod common;

use bibflow_common::types::{ErrorStatus, JobExecutionStatus};
use bibflow_server::features::chunks::commands::{process_chunk, ProcessChunkCommand};
use bibflow_server::features::job_executions::commands::{
    init_job_executions, InitJobExecutionsCommand,
};
use uuid::Uuid;

use common::{chunk, init_files, marc_bib, marc_holdings, setup};

async fn init_single_job(
    ctx: &bibflow_server::storage::AppContext,
) -> bibflow_server::models::JobExecution {
    let response = init_job_executions::handle(
        ctx,
        InitJobExecutionsCommand { request: init_files(&["records.mrc"]) },
    )
    .await
    .unwrap();
    response.job_executions.into_iter().next().unwrap()
}

#[tokio::test]
async fn single_chunk_import_reaches_parsing_finished() {
    let (state, ctx) = setup();
    let job = init_single_job(&ctx).await;

    let records = vec![marc_bib("First"), marc_bib("Second"), marc_bib("Third")];
    let outcome = process_chunk::handle(
        &ctx,
        ProcessChunkCommand { job_execution_id: job.id, chunk: chunk(records, 3, 3, true) },
    )
    .await
    .unwrap();

    assert_eq!(outcome.classified, 3);
    assert_eq!(outcome.errored, 0);

    let stored = ctx.job_executions.get(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobExecutionStatus::ParsingFinished);
    assert_eq!(state.publisher.events().len(), 3);

    // Each record left one PARSE row behind
    let journal = ctx.journal.by_job(job.id).await.unwrap();
    assert_eq!(journal.len(), 3);

    let progress = ctx.progress.get(job.id).await.unwrap().unwrap();
    assert_eq!(progress.expected_total, 3);
}

#[tokio::test]
async fn shuffled_chunk_arrival_completes_exactly_when_all_records_arrive() {
    let (state, ctx) = setup();
    let job = init_single_job(&ctx).await;

    // Six records in three chunks, submitted last-first
    let submissions = vec![
        chunk(vec![marc_bib("Five"), marc_bib("Six")], 6, 6, true),
        chunk(vec![marc_bib("One"), marc_bib("Two")], 2, 6, false),
        chunk(vec![marc_bib("Three"), marc_bib("Four")], 4, 6, false),
    ];

    for (index, submission) in submissions.into_iter().enumerate() {
        process_chunk::handle(
            &ctx,
            ProcessChunkCommand { job_execution_id: job.id, chunk: submission },
        )
        .await
        .unwrap();

        let stored = ctx.job_executions.get(job.id).await.unwrap().unwrap();
        if index < 2 {
            assert_eq!(
                stored.status,
                JobExecutionStatus::ParsingInProgress,
                "job must not finish with records still unsent"
            );
        } else {
            assert_eq!(stored.status, JobExecutionStatus::ParsingFinished);
        }
    }

    assert_eq!(state.publisher.events().len(), 6);
}

#[tokio::test]
async fn holdings_without_linking_field_is_dropped_silently() {
    let (state, ctx) = setup();
    let job = init_single_job(&ctx).await;

    let records = vec![marc_bib("Kept"), marc_holdings(false), marc_holdings(true)];
    let outcome = process_chunk::handle(
        &ctx,
        ProcessChunkCommand { job_execution_id: job.id, chunk: chunk(records, 3, 3, true) },
    )
    .await
    .unwrap();

    assert_eq!(outcome.classified, 2);
    assert_eq!(outcome.discarded, 1);
    assert_eq!(state.publisher.events().len(), 2);

    // Dropped records do not block completion
    let stored = ctx.job_executions.get(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobExecutionStatus::ParsingFinished);

    // Only the emitted records still hold flow-control slots; the dropped
    // one was released with the chunk
    assert_eq!(ctx.flow_control.in_flight(), 2);
}

#[tokio::test]
async fn publish_outage_moves_job_to_error() {
    let (state, ctx) = setup();
    let job = init_single_job(&ctx).await;
    state.publisher.set_failing(true);

    let result = process_chunk::handle(
        &ctx,
        ProcessChunkCommand {
            job_execution_id: job.id,
            chunk: chunk(vec![marc_bib("Doomed")], 1, 1, true),
        },
    )
    .await;
    assert!(matches!(result, Err(process_chunk::ProcessChunkError::Engine(_))));

    let stored = ctx.job_executions.get(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobExecutionStatus::Error);
    assert_eq!(stored.error_status, Some(ErrorStatus::FileProcessingError));

    // A failed job accepts no further chunks
    let result = process_chunk::handle(
        &ctx,
        ProcessChunkCommand {
            job_execution_id: job.id,
            chunk: chunk(vec![marc_bib("Late")], 2, 2, false),
        },
    )
    .await;
    assert!(matches!(result, Err(process_chunk::ProcessChunkError::JobFinished(_, _))));
}

#[tokio::test]
async fn unknown_job_rejects_chunks() {
    let (_state, ctx) = setup();
    let result = process_chunk::handle(
        &ctx,
        ProcessChunkCommand {
            job_execution_id: Uuid::new_v4(),
            chunk: chunk(vec![marc_bib("Orphan")], 1, 1, true),
        },
    )
    .await;
    assert!(matches!(result, Err(process_chunk::ProcessChunkError::JobNotFound(_))));
}
