pub mod judge_update;
pub mod worker_dlq;

pub use judge_update::consume_judge_updates;
pub use worker_dlq::consume_worker_dlq;

use common::SubmissionStatus;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::warn;

use crate::entity::submission;

/// Settle a submission as SystemError with the given error code and message.
/// Conditional on a non-terminal status: a late dead letter for a submission
/// another worker already judged must not rewrite the committed verdict.
pub async fn mark_submission_system_error<C: ConnectionTrait>(
    conn: &C,
    submission_id: i32,
    error_code: &str,
    error_message: &str,
) -> anyhow::Result<()> {
    let settled = submission::Entity::update_many()
        .col_expr(
            submission::Column::Status,
            SubmissionStatus::SystemError.as_str().into(),
        )
        .col_expr(submission::Column::ErrorCode, error_code.into())
        .col_expr(submission::Column::ErrorMessage, error_message.into())
        .filter(submission::Column::Id.eq(submission_id))
        .filter(
            submission::Column::Status.is_in([
                SubmissionStatus::Pending.as_str(),
                SubmissionStatus::Running.as_str(),
            ]),
        )
        .exec(conn)
        .await?;

    if settled.rows_affected == 0 {
        warn!(
            submission_id,
            error_code, "Submission already terminal, dead letter dropped"
        );
    }
    Ok(())
}
