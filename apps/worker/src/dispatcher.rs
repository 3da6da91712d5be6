/// Job dispatcher — starts one bounded worker pool per named queue and
/// waits for shutdown. Ported from `bullmq_consumer.py::KreedaJobProcessor`
/// (`start_workers`/`shutdown_workers`/`run`), replacing asyncio tasks +
/// the BullMQ Python client with `tokio::task::JoinSet` workers bound by a
/// `tokio::sync::Semaphore`, and signal handling in the pattern of
/// `examples/Xevion-banner/src/signals.rs`.
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::backend::models::JobRecord;
use crate::errors::PipelineError;
use crate::models::ranking::RankingBatchJob;
use crate::pipeline::{jd_pipeline, ranking_pipeline, resume_pipeline, PipelineContext};
use crate::queue::JobQueue;

const JD_QUEUE: &str = "jd-processing";
const RESUME_QUEUE: &str = "resume-processing";
const RANKING_QUEUE: &str = "ranking";
const JD_CONCURRENCY: usize = 1;
const RANKING_CONCURRENCY: usize = 2;
const POP_TIMEOUT_SECS: f64 = 5.0;

#[derive(Debug, Deserialize)]
struct JdJobPayload {
    #[serde(rename = "jobId")]
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct ResumeJobPayload {
    #[serde(alias = "resumeId")]
    resume_id: String,
    #[serde(alias = "jobId")]
    job_id: String,
    #[serde(default, alias = "resumeIndex")]
    index: usize,
    #[serde(default, alias = "totalResumes")]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct RankingJobPayload {
    #[serde(rename = "jobId")]
    job_id: String,
    #[serde(default, rename = "scoreResults")]
    score_result_ids: Vec<String>,
    #[serde(default, rename = "batchIndex")]
    batch_index: u32,
    #[serde(default, rename = "totalBatches")]
    total_batches: u32,
    #[serde(default, rename = "rankingCriteria")]
    ranking_criteria: crate::models::ranking::RankingCriteria,
}

/// Runs all three worker pools until SIGINT/SIGTERM, then waits for
/// in-flight jobs to drain.
pub async fn run(ctx: PipelineContext, queue: Arc<dyn JobQueue>, max_resume_workers: usize) {
    info!("starting kreeda match worker pools");

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let mut pools = JoinSet::new();

    pools.spawn(run_pool(
        ctx.clone(),
        queue.clone(),
        JD_QUEUE,
        JD_CONCURRENCY,
        shutdown.clone(),
        handle_jd_job,
    ));
    pools.spawn(run_pool(
        ctx.clone(),
        queue.clone(),
        RESUME_QUEUE,
        max_resume_workers,
        shutdown.clone(),
        handle_resume_job,
    ));
    pools.spawn(run_pool(
        ctx.clone(),
        queue.clone(),
        RANKING_QUEUE,
        RANKING_CONCURRENCY,
        shutdown.clone(),
        handle_ranking_job,
    ));

    info!("all worker pools started, press Ctrl+C to stop");
    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining in-flight jobs");
    shutdown.notify_waiters();

    while let Some(result) = pools.join_next().await {
        if let Err(e) = result {
            error!("worker pool task panicked: {e}");
        }
    }
    info!("all worker pools shut down successfully");
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C signal handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut stream = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        stream.recv().await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = sigterm => info!("received SIGTERM"),
    }
}

type JobHandler = fn(PipelineContext, String) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>;

async fn run_pool(
    ctx: PipelineContext,
    queue: Arc<dyn JobQueue>,
    queue_name: &'static str,
    concurrency: usize,
    shutdown: Arc<tokio::sync::Notify>,
    handler: JobHandler,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    info!("worker pool started for '{queue_name}' (concurrency {concurrency})");

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            popped = queue.pop(queue_name, POP_TIMEOUT_SECS) => {
                match popped {
                    Ok(Some(payload)) => {
                        let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
                        let ctx = ctx.clone();
                        tasks.spawn(async move {
                            let _permit = permit;
                            handler(ctx, payload).await;
                        });
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("'{queue_name}' pop failed: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }

    info!("'{queue_name}' pool draining in-flight jobs");
    while tasks.join_next().await.is_some() {}
    info!("'{queue_name}' pool drained");
}

fn handle_jd_job(ctx: PipelineContext, payload: String) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
    Box::pin(async move {
        let parsed: JdJobPayload = match serde_json::from_str(&payload) {
            Ok(p) => p,
            Err(e) => {
                error!("malformed jd-processing payload: {e}");
                return;
            }
        };

        let job_record: Result<JobRecord, PipelineError> =
            ctx.backend.get(&format!("/updates/job/{}", parsed.job_id)).await;
        let raw_text = match job_record {
            Ok(record) => record.raw_text,
            Err(e) => {
                error!("failed to fetch job {} for jd processing: {e}", parsed.job_id);
                return;
            }
        };

        if let Err(e) = jd_pipeline::run(&ctx, jd_pipeline::JdJob { job_id: parsed.job_id, raw_text }).await {
            error!("jd pipeline failed: {e}");
        }
    })
}

fn handle_resume_job(
    ctx: PipelineContext,
    payload: String,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
    Box::pin(async move {
        let parsed: ResumeJobPayload = match serde_json::from_str(&payload) {
            Ok(p) => p,
            Err(e) => {
                error!("malformed resume-processing payload: {e}");
                return;
            }
        };

        let job = resume_pipeline::ResumeJob {
            resume_id: parsed.resume_id,
            job_id: parsed.job_id,
            index: parsed.index,
            total: parsed.total,
        };

        if let Err(e) = resume_pipeline::run(&ctx, job).await {
            error!("resume pipeline failed: {e}");
        }
    })
}

fn handle_ranking_job(
    ctx: PipelineContext,
    payload: String,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
    Box::pin(async move {
        let parsed: RankingJobPayload = match serde_json::from_str(&payload) {
            Ok(p) => p,
            Err(e) => {
                error!("malformed ranking payload: {e}");
                return;
            }
        };

        let job = RankingBatchJob {
            job_id: parsed.job_id,
            batch_index: parsed.batch_index.max(1),
            total_batches: parsed.total_batches.max(1),
            score_result_ids: parsed.score_result_ids,
            ranking_criteria: parsed.ranking_criteria,
        };

        if let Err(e) = ranking_pipeline::run(&ctx, job).await {
            error!("ranking pipeline failed: {e}");
        }
    })
}
