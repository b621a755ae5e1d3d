use std::sync::Arc;

use common::dlq::{DlqEnvelope, SubmissionDlqErrorCode};
use mq::{BroccoliError, BrokerMessage, Mq};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use super::mark_submission_system_error;

/// Consume envelopes the worker parked after exhausting its retries, and make
/// sure the affected submission does not stay stuck in Pending or Running.
pub async fn consume_worker_dlq(db: DatabaseConnection, mq: Arc<Mq>, queue_name: String) {
    info!(queue = %queue_name, "Starting worker DLQ consumer");

    let result = mq
        .process_messages(
            &queue_name,
            None,
            None,
            move |message: BrokerMessage<DlqEnvelope>| {
                let db = db.clone();
                async move {
                    let envelope = message.payload;
                    let message_id = envelope.message_id.clone();

                    warn!(
                        message_id = %message_id,
                        submission_id = ?envelope.submission_id,
                        error_code = ?envelope.error_code,
                        error_message = %envelope.error_message,
                        attempts = envelope.attempts,
                        failed_at = %envelope.failed_at,
                        "Received worker DLQ envelope"
                    );

                    let Some(submission_id) = envelope.submission_id else {
                        info!(
                            message_id = %message_id,
                            "Skipping submission status update: submission_id unknown"
                        );
                        return Ok(());
                    };

                    if let Err(e) = mark_submission_system_error(
                        &db,
                        submission_id,
                        SubmissionDlqErrorCode::WORKER_PROCESSING_FAILED,
                        "Worker failed to process job after max retries",
                    )
                    .await
                    {
                        error!(
                            submission_id,
                            message_id = %message_id,
                            error = %e,
                            "Failed to mark submission as SystemError"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }

                    info!(
                        submission_id,
                        message_id = %message_id,
                        "Marked submission as SystemError from DLQ envelope"
                    );
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Worker DLQ consumer stopped unexpectedly");
    }
}
