use std::sync::Arc;

use chrono::Utc;
use common::judge_result::{JudgeResult, JudgeUpdate};
use common::SubmissionStatus;
use mq::{BroccoliError, BrokerMessage, Mq};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use tracing::{error, info, warn};

use crate::aggregate::apply_judged_submission;
use crate::database::supports_row_locks;
use crate::entity::{submission, test_case_result};

/// Consume judge updates from the update queue.
pub async fn consume_judge_updates(db: DatabaseConnection, mq: Arc<Mq>, queue_name: String) {
    info!(queue = %queue_name, "Starting judge update consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None, // single-threaded for sequential DB writes
            None,
            move |message: BrokerMessage<JudgeUpdate>| {
                let db = db.clone();
                async move {
                    let update = message.payload;
                    let submission_id = update.submission_id();

                    let outcome = match update {
                        JudgeUpdate::Started { job_id, .. } => {
                            process_started(&db, submission_id, &job_id).await
                        }
                        JudgeUpdate::Completed(result) => process_completed(&db, result).await,
                    };

                    if let Err(e) = outcome {
                        error!(
                            submission_id,
                            error = %e,
                            "Failed to process judge update"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Judge update consumer stopped unexpectedly");
    }
}

/// Claim the Pending -> Running transition. The update is conditional on the
/// current status, so a Started arriving after completion changes nothing.
pub async fn process_started(
    db: &DatabaseConnection,
    submission_id: i32,
    job_id: &str,
) -> anyhow::Result<()> {
    let claimed = submission::Entity::update_many()
        .col_expr(
            submission::Column::Status,
            SubmissionStatus::Running.as_str().into(),
        )
        .filter(submission::Column::Id.eq(submission_id))
        .filter(submission::Column::Status.eq(SubmissionStatus::Pending.as_str()))
        .exec(db)
        .await?;

    if claimed.rows_affected == 0 {
        info!(
            submission_id,
            job_id, "Submission already past Pending, Started is a no-op"
        );
    } else {
        info!(submission_id, job_id, "Submission claimed as Running");
    }
    Ok(())
}

/// Write the terminal verdict, per-case results, and fold the submission into
/// the best-submission table, all in one transaction.
pub async fn process_completed(db: &DatabaseConnection, result: JudgeResult) -> anyhow::Result<()> {
    let txn = db.begin().await?;

    let mut query = submission::Entity::find_by_id(result.submission_id);
    if supports_row_locks(&txn) {
        query = query.lock(LockType::Update);
    }
    let existing = query
        .one(&txn)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Submission {} not found", result.submission_id))?;

    if existing.status.is_terminal() {
        warn!(
            submission_id = result.submission_id,
            status = ?existing.status,
            "Submission already terminal, duplicate completion dropped"
        );
        txn.commit().await?;
        return Ok(());
    }

    let (error_code, error_message) = result
        .error_info
        .as_ref()
        .map(|info| (Some(info.code.clone()), Some(info.message.clone())))
        .unwrap_or((None, None));

    let submission_update = submission::ActiveModel {
        id: Set(result.submission_id),
        status: Set(result.status),
        passed_testcase: Set(Some(result.passed_testcase)),
        total_testcase: Set(Some(result.total_testcase)),
        score: Set(Some(result.score)),
        total_time: Set(result.total_time),
        total_memory: Set(result.total_memory),
        compile_output: Set(result.compile_output.clone()),
        error_code: Set(error_code),
        error_message: Set(error_message),
        judged_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    let judged = submission_update.update(&txn).await?;

    let now = Utc::now();
    for tc_result in result.test_case_results.iter() {
        let model = test_case_result::ActiveModel {
            submission_id: Set(result.submission_id),
            test_case_id: Set(tc_result.test_case_id),
            verdict: Set(tc_result.verdict),
            score: Set(tc_result.score),
            time_ms: Set(tc_result.time_ms),
            memory_kb: Set(tc_result.memory_kb),
            created_at: Set(now),
            ..Default::default()
        };
        model.insert(&txn).await?;
    }

    // Infrastructure failures never compete for the best submission.
    if result.status != SubmissionStatus::SystemError {
        apply_judged_submission(&txn, &judged).await?;
    }

    txn.commit().await?;

    info!(
        submission_id = result.submission_id,
        status = ?result.status,
        passed = result.passed_testcase,
        total = result.total_testcase,
        score = result.score,
        "Processed judge result"
    );

    Ok(())
}
