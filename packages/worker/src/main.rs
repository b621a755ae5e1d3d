mod config;
mod judge;
mod runner;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use common::config::RetryAppConfig;
use common::dlq::{DlqEnvelope, DlqErrorCode, DlqMessageType};
use common::judge_job::JudgeJob;
use common::judge_result::{JudgeErrorInfo, JudgeResult, JudgeUpdate};
use common::retry::{
    RetryCleanupGuard, RetryDecision, RetryTracker, calculate_backoff, spawn_cleanup_task,
};
use common::storage::FsBlobStore;
use mq::{BroccoliError, BrokerMessage, MqConfig, init_mq};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::judge::handle_judge_job;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = config::WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    let storage = Arc::new(
        FsBlobStore::open(config.storage.root.clone(), config.storage.max_bytes)
            .await
            .context("Failed to open blob store")?,
    );

    let mq = Arc::new(
        init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        .context("Failed to initialize MQ")?,
    );

    info!(
        job_queue = %config.mq.job_queue,
        update_queue = %config.mq.update_queue,
        dlq_queue = %config.mq.dlq_queue,
        max_retries = config.retry.max_retries,
        "MQ connected"
    );

    let update_queue = config.mq.update_queue.clone();
    let dlq_queue = config.mq.dlq_queue.clone();
    let retry_config = config.retry;
    let workspace_root = config.worker.workspace_root.clone();
    let mq_for_handler = Arc::clone(&mq);

    let retry_tracker = Arc::new(Mutex::new(RetryTracker::new(retry_config.max_retries)));

    // TODO: Store handle for graceful shutdown. Currently the task runs until process exit.
    let _cleanup_handle = spawn_cleanup_task(
        retry_tracker.clone(),
        Duration::from_secs(config.worker.retry_cleanup_interval_secs),
        Duration::from_secs(config.worker.retry_max_age_secs),
    );

    let result = mq
        .process_messages(
            &config.mq.job_queue,
            Some(config.worker.batch_size), // concurrent jobs
            None,
            move |message: BrokerMessage<JudgeJob>| {
                let mq = Arc::clone(&mq_for_handler);
                let storage = Arc::clone(&storage);
                let update_queue = update_queue.clone();
                let dlq_queue = dlq_queue.clone();
                let workspace_root = workspace_root.clone();
                let retry_tracker = Arc::clone(&retry_tracker);
                async move {
                    process_message(
                        message,
                        &mq,
                        storage.as_ref(),
                        &workspace_root,
                        &update_queue,
                        &dlq_queue,
                        &retry_config,
                        &retry_tracker,
                    )
                    .await
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Worker stopped unexpectedly");
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn process_message(
    message: BrokerMessage<JudgeJob>,
    mq: &Arc<mq::Mq>,
    storage: &FsBlobStore,
    workspace_root: &std::path::Path,
    update_queue: &str,
    dlq_queue: &str,
    retry_config: &RetryAppConfig,
    retry_tracker: &Arc<Mutex<RetryTracker>>,
) -> Result<(), BroccoliError> {
    let job = message.payload;
    let job_id = job.job_id.clone();
    let submission_id = job.submission_id;

    let started = JudgeUpdate::Started {
        job_id: job_id.clone(),
        submission_id,
    };
    if let Err(e) = mq.publish(update_queue, None, &started, None).await {
        // Not fatal: the Running flip is cosmetic next to the verdict.
        warn!(job_id = %job_id, error = %e, "Failed to publish Started update");
    }

    let mut cleanup_guard = RetryCleanupGuard::new(retry_tracker, &job_id);

    loop {
        match process_job(&job, mq, storage, workspace_root, update_queue).await {
            Ok(()) => {
                retry_tracker.lock().await.clear(&job_id);
                cleanup_guard.defuse();
                return Ok(());
            }
            Err(e) => {
                let error_str = e.to_string();
                let decision = retry_tracker
                    .lock()
                    .await
                    .record_failure(&job_id, &error_str);

                match decision {
                    RetryDecision::Retry { attempt } => {
                        let delay = calculate_backoff(
                            attempt,
                            retry_config.backoff_base_ms,
                            retry_config.backoff_max_ms,
                        );
                        warn!(
                            submission_id,
                            job_id = %job_id,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Retrying job processing"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::Exhausted {
                        attempts,
                        last_error,
                    } => {
                        error!(
                            submission_id,
                            job_id = %job_id,
                            attempts,
                            error = %e,
                            "Max retries exhausted, sending to DLQ"
                        );

                        let envelope = DlqEnvelope {
                            message_id: job_id.clone(),
                            message_type: DlqMessageType::JudgeJob,
                            submission_id: Some(submission_id),
                            payload: serde_json::to_value(&job).unwrap_or_default(),
                            error_code: DlqErrorCode::MaxRetriesExceeded,
                            error_message: last_error.clone(),
                            attempts,
                            failed_at: Utc::now(),
                        };

                        if let Err(pub_err) = mq.publish(dlq_queue, None, &envelope, None).await {
                            error!(error = %pub_err, "Failed to publish to DLQ queue");
                            return Err(BroccoliError::Publish(format!(
                                "Failed to publish to DLQ: {pub_err}"
                            )));
                        }

                        // The submission must not stay Running forever; a
                        // SystemError completion settles it even if the DLQ
                        // consumer also marks it (the server dedups).
                        let fallback = JudgeUpdate::Completed(JudgeResult::system_error(
                            job_id.clone(),
                            submission_id,
                            JudgeErrorInfo::new("WORKER_PROCESSING_FAILED", last_error),
                        ));
                        if let Err(pub_err) = mq.publish(update_queue, None, &fallback, None).await
                        {
                            warn!(error = %pub_err, "Failed to publish SystemError result");
                        }

                        cleanup_guard.defuse();
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn process_job(
    job: &JudgeJob,
    mq: &Arc<mq::Mq>,
    storage: &FsBlobStore,
    workspace_root: &std::path::Path,
    update_queue: &str,
) -> Result<(), BroccoliError> {
    info!(
        submission_id = job.submission_id,
        job_id = %job.job_id,
        language = %job.language,
        test_cases = job.test_cases.len(),
        "Processing judge job"
    );

    let result = handle_judge_job(job, storage, workspace_root)
        .await
        .map_err(|e| BroccoliError::Job(format!("Judging failed: {e}")))?;

    let status = result.status;
    let passed = result.passed_testcase;
    let total = result.total_testcase;
    let score = result.score;

    let update = JudgeUpdate::Completed(result);
    mq.publish(update_queue, None, &update, None)
        .await
        .map_err(|e| BroccoliError::Publish(format!("Failed to publish JudgeUpdate: {e}")))?;

    info!(
        submission_id = job.submission_id,
        status = ?status,
        passed,
        total,
        score,
        "Published result to queue"
    );

    Ok(())
}
