//! Process chunk command
//!
//! One received RawRecordsDto runs through six steps, each a potential
//! failure point: persist the chunk IN_PROGRESS, move the job into
//! parsing (idempotent), hand the records to the change engine, mark the
//! chunk COMPLETED or ERROR, re-run completion detection, and on
//! completion transition the job. Chunks arrive out of submission order;
//! the completion check runs after every chunk, and a job never reaches a
//! completion status while any chunk is still IN_PROGRESS.

use bibflow_common::types::{ErrorStatus, JobExecutionStatus};
use chrono::Utc;
use uuid::Uuid;

use crate::engine::{ChangeEngine, ChunkOutcome};
use crate::features::job_executions::commands::update_status::apply_status;
use crate::models::{ChunkState, JobExecution, JobExecutionSourceChunk, RawRecordsDto};
use crate::storage::{AppContext, StoreError};

/// Command carrying one submitted batch of raw records
#[derive(Debug, Clone)]
pub struct ProcessChunkCommand {
    pub job_execution_id: Uuid,
    pub chunk: RawRecordsDto,
}

/// Errors that can occur while processing a chunk
#[derive(Debug, thiserror::Error)]
pub enum ProcessChunkError {
    /// The job does not exist or is soft-deleted
    #[error("JobExecution '{0}' not found")]
    JobNotFound(Uuid),

    /// The job is already in a terminal state and accepts no more records
    #[error("JobExecution '{0}' is {1} and accepts no further chunks")]
    JobFinished(Uuid, &'static str),

    /// A PARENT_MULTIPLE umbrella job never carries records itself
    #[error("JobExecution '{0}' is a parent job and does not accept records")]
    ParentJob(Uuid),

    /// Persisting the chunk snapshot failed; the submitter should retry
    #[error("Failed to persist source chunk: {0}")]
    ChunkPersistence(StoreError),

    /// The change engine could not reach the outbound channel or journal
    #[error("Chunk processing failed: {0}")]
    Engine(String),

    /// A storage error occurred
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Handles one chunk of raw records end to end
pub async fn handle(
    ctx: &AppContext,
    command: ProcessChunkCommand,
) -> Result<ChunkOutcome, ProcessChunkError> {
    let mut job = ctx
        .job_executions
        .get(command.job_execution_id)
        .await?
        .ok_or(ProcessChunkError::JobNotFound(command.job_execution_id))?;

    if job.status == JobExecutionStatus::Parent {
        return Err(ProcessChunkError::ParentJob(job.id));
    }
    if job.status.is_terminal() {
        return Err(ProcessChunkError::JobFinished(job.id, job.status.as_str()));
    }

    let dto = command.chunk;
    let chunk = JobExecutionSourceChunk {
        id: dto.id,
        job_execution_id: job.id,
        chunk_size: dto.initial_records.len() as i32,
        records_counter: dto.records_metadata.counter,
        last: dto.records_metadata.last,
        state: ChunkState::InProgress,
        created_date: Utc::now(),
        completed_date: None,
    };
    ctx.chunks.save(&chunk).await.map_err(ProcessChunkError::ChunkPersistence)?;

    ensure_parsing(ctx, &mut job).await?;

    ctx.flow_control.track_chunk_received(dto.initial_records.len() as i64);
    ctx.progress.initialize(job.id, dto.records_metadata.total).await?;
    ctx.monitoring.touch(job.id, Utc::now()).await?;

    let engine =
        ChangeEngine::new(ctx.publisher.clone(), ctx.journal.clone(), ctx.mapping_metadata.clone());
    let result = engine.process_chunk(&job, &dto).await;

    match result {
        Ok(outcome) => {
            // Discarded and parse-errored records reach no downstream
            // handler, so no outcome row will ever release their slots
            for _ in 0..(outcome.discarded + outcome.errored) {
                ctx.flow_control.track_record_complete();
            }
            ctx.chunks.complete(chunk.id, ChunkState::Completed, Utc::now()).await?;
            finish_if_complete(ctx, job.id).await?;
            Ok(outcome)
        },
        Err(error) => {
            tracing::error!(
                job_execution_id = %job.id,
                chunk_id = %chunk.id,
                error = %error,
                "Chunk failed; outbound channel or journal unreachable"
            );
            ctx.chunks.complete(chunk.id, ChunkState::Error, Utc::now()).await?;
            fail_job(ctx, job.id).await?;
            Err(ProcessChunkError::Engine(error.to_string()))
        },
    }
}

/// Move a NEW job into PARSING_IN_PROGRESS; a no-op when already parsing
async fn ensure_parsing(ctx: &AppContext, job: &mut JobExecution) -> Result<(), ProcessChunkError> {
    if job.status != JobExecutionStatus::New {
        return Ok(());
    }
    apply_status(job, JobExecutionStatus::ParsingInProgress, None);
    ctx.job_executions.update(job).await?;
    Ok(())
}

/// Re-run completion detection and transition the job when done
async fn finish_if_complete(ctx: &AppContext, job_execution_id: Uuid) -> Result<(), ProcessChunkError> {
    let state = ctx.chunks.completion_state(job_execution_id).await?;
    if !state.is_processing_finished() {
        return Ok(());
    }

    if state.any_error {
        fail_job(ctx, job_execution_id).await?;
        return Ok(());
    }

    // Re-read the latest persisted state; a concurrent chunk may already
    // have finished the job
    let Some(mut job) = ctx.job_executions.get(job_execution_id).await? else {
        return Ok(());
    };
    if !job.status.can_transition_to(JobExecutionStatus::ParsingFinished) {
        return Ok(());
    }
    apply_status(&mut job, JobExecutionStatus::ParsingFinished, None);
    ctx.job_executions.update(&job).await?;
    tracing::info!(job_execution_id = %job.id, "All chunks completed; parsing finished");
    Ok(())
}

async fn fail_job(ctx: &AppContext, job_execution_id: Uuid) -> Result<(), ProcessChunkError> {
    let Some(mut job) = ctx.job_executions.get(job_execution_id).await? else {
        return Ok(());
    };
    if job.status == JobExecutionStatus::Error {
        return Ok(());
    }
    apply_status(&mut job, JobExecutionStatus::Error, Some(ErrorStatus::FileProcessingError));
    ctx.job_executions.update(&job).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::flow_control::FlowControlSettings;
    use crate::engine::marc::tests::bib_record;
    use crate::models::test_util::test_job;
    use crate::models::{InitialRecord, RecordsContentType, RecordsMetadata};
    use crate::storage::memory::InMemoryState;

    fn chunk(records: usize, counter: i32, total: i32, last: bool) -> RawRecordsDto {
        RawRecordsDto {
            id: Uuid::new_v4(),
            initial_records: (0..records)
                .map(|i| InitialRecord {
                    record: bib_record(),
                    order: Some(counter - records as i32 + i as i32),
                })
                .collect(),
            records_metadata: RecordsMetadata {
                counter,
                total,
                last,
                content_type: RecordsContentType::MarcJson,
            },
        }
    }

    async fn seeded() -> (InMemoryState, AppContext, JobExecution) {
        let state = InMemoryState::new();
        let ctx = state.context(FlowControlSettings::default());
        let job = test_job();
        ctx.job_executions.save(&job).await.unwrap();
        (state, ctx, job)
    }

    #[tokio::test]
    async fn single_chunk_job_reaches_parsing_finished() {
        let (state, ctx, job) = seeded().await;

        let outcome = handle(
            &ctx,
            ProcessChunkCommand { job_execution_id: job.id, chunk: chunk(3, 3, 3, true) },
        )
        .await
        .unwrap();
        assert_eq!(outcome.classified, 3);

        let stored = ctx.job_executions.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobExecutionStatus::ParsingFinished);
        assert_eq!(state.publisher.events().len(), 3);
    }

    #[tokio::test]
    async fn last_chunk_arriving_first_defers_completion() {
        let (_state, ctx, job) = seeded().await;

        // The last chunk arrives before the first; completion must wait
        handle(
            &ctx,
            ProcessChunkCommand { job_execution_id: job.id, chunk: chunk(2, 4, 4, true) },
        )
        .await
        .unwrap();
        let stored = ctx.job_executions.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobExecutionStatus::ParsingInProgress);

        handle(
            &ctx,
            ProcessChunkCommand { job_execution_id: job.id, chunk: chunk(2, 2, 4, false) },
        )
        .await
        .unwrap();
        let stored = ctx.job_executions.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobExecutionStatus::ParsingFinished);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let state = InMemoryState::new();
        let ctx = state.context(FlowControlSettings::default());
        let result = handle(
            &ctx,
            ProcessChunkCommand { job_execution_id: Uuid::new_v4(), chunk: chunk(1, 1, 1, true) },
        )
        .await;
        assert!(matches!(result, Err(ProcessChunkError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn publish_outage_fails_chunk_and_job() {
        let (state, ctx, job) = seeded().await;
        state.publisher.set_failing(true);

        let result = handle(
            &ctx,
            ProcessChunkCommand { job_execution_id: job.id, chunk: chunk(2, 2, 2, true) },
        )
        .await;
        assert!(matches!(result, Err(ProcessChunkError::Engine(_))));

        let stored = ctx.job_executions.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobExecutionStatus::Error);
        assert_eq!(stored.error_status, Some(ErrorStatus::FileProcessingError));
    }

    #[tokio::test]
    async fn terminal_job_rejects_chunks() {
        let (_state, ctx, mut job) = seeded().await;
        job.status = JobExecutionStatus::Cancelled;
        job.sync_ui_status();
        ctx.job_executions.update(&job).await.unwrap();

        let result = handle(
            &ctx,
            ProcessChunkCommand { job_execution_id: job.id, chunk: chunk(1, 1, 1, true) },
        )
        .await;
        assert!(matches!(result, Err(ProcessChunkError::JobFinished(_, _))));
    }

    #[tokio::test]
    async fn discarded_and_parse_errored_records_release_their_slots() {
        let state = InMemoryState::new();
        let ctx = state.context(FlowControlSettings {
            enabled: true,
            max_simultaneous_records: 2,
            records_threshold: 1,
        });
        let job = test_job();
        ctx.job_executions.save(&job).await.unwrap();

        // One record emits, one is dropped (holdings without 004), one
        // fails to parse
        let records = vec![
            bib_record(),
            crate::engine::marc::tests::holdings_record(false),
            "not a marc record".to_string(),
        ];
        let dto = RawRecordsDto {
            id: Uuid::new_v4(),
            initial_records: records
                .into_iter()
                .enumerate()
                .map(|(i, record)| InitialRecord { record, order: Some(i as i32) })
                .collect(),
            records_metadata: RecordsMetadata {
                counter: 3,
                total: 3,
                last: true,
                content_type: RecordsContentType::MarcJson,
            },
        };

        let outcome =
            handle(&ctx, ProcessChunkCommand { job_execution_id: job.id, chunk: dto })
                .await
                .unwrap();
        assert_eq!(outcome.classified, 1);
        assert_eq!(outcome.discarded, 1);
        assert_eq!(outcome.errored, 1);

        // Only the emitted record still occupies a slot; the other two
        // were released with the chunk
        assert_eq!(ctx.flow_control.in_flight(), 1);
        ctx.flow_control.track_record_complete();
        assert_eq!(ctx.flow_control.in_flight(), 0);
    }

    #[tokio::test]
    async fn progress_expected_total_is_first_chunk_wins() {
        let (_state, ctx, job) = seeded().await;

        handle(
            &ctx,
            ProcessChunkCommand { job_execution_id: job.id, chunk: chunk(2, 2, 10, false) },
        )
        .await
        .unwrap();
        handle(
            &ctx,
            ProcessChunkCommand { job_execution_id: job.id, chunk: chunk(2, 4, 99, true) },
        )
        .await
        .unwrap();

        let progress = ctx.progress.get(job.id).await.unwrap().unwrap();
        assert_eq!(progress.expected_total, 10);
    }
}
