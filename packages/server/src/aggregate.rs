use chrono::{DateTime, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use tracing::{debug, info};

use crate::database::supports_row_locks;
use crate::entity::{assignment_problem, assignment_user, best_submission, submission};

/// Denormalized fields of a freshly judged submission, compared against the
/// current best row.
#[derive(Debug, Clone)]
pub struct BestCandidate {
    pub submission_id: i32,
    pub passed_testcase: i32,
    pub score: i32,
    pub submitted_at: DateTime<Utc>,
}

impl BestCandidate {
    pub fn from_submission(sub: &submission::Model) -> Self {
        Self {
            submission_id: sub.id,
            passed_testcase: sub.passed_testcase.unwrap_or(0),
            score: sub.score.unwrap_or(0),
            submitted_at: sub.submitted_at,
        }
    }
}

/// Total order over submissions of one (student, problem) pair: more passed
/// cases win, then higher score, then the earlier submission, then the lower
/// submission id. Every comparison has a strict winner, so concurrent
/// completions converge on the same row regardless of arrival order.
pub fn candidate_beats(candidate: &BestCandidate, current: &best_submission::Model) -> bool {
    if candidate.passed_testcase != current.passed_testcase {
        return candidate.passed_testcase > current.passed_testcase;
    }
    if candidate.score != current.score {
        return candidate.score > current.score;
    }
    if candidate.submitted_at != current.submitted_at {
        return candidate.submitted_at < current.submitted_at;
    }
    candidate.submission_id < current.submission_id
}

/// Fold a judged submission into the best-submission table and refresh the
/// owning assignment_user row. Must run inside the same transaction that
/// wrote the verdict.
///
/// The assignment_user row is locked first, serializing concurrent
/// completions for the same student.
pub async fn apply_judged_submission<C: ConnectionTrait>(
    conn: &C,
    sub: &submission::Model,
) -> anyhow::Result<()> {
    let Some(assignment_user_id) = sub.assignment_user_id else {
        debug!(submission_id = sub.id, "Practice submission, no aggregation");
        return Ok(());
    };

    let mut query = assignment_user::Entity::find_by_id(assignment_user_id);
    if supports_row_locks(conn) {
        query = query.lock(LockType::Update);
    }
    let participant = query
        .one(conn)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Assignment user {assignment_user_id} not found"))?;

    let candidate = BestCandidate::from_submission(sub);

    let current = best_submission::Entity::find()
        .filter(best_submission::Column::AssignmentUserId.eq(assignment_user_id))
        .filter(best_submission::Column::ProblemId.eq(sub.problem_id))
        .one(conn)
        .await?;

    let now = Utc::now();
    match current {
        None => {
            let row = best_submission::ActiveModel {
                assignment_user_id: Set(assignment_user_id),
                problem_id: Set(sub.problem_id),
                submission_id: Set(candidate.submission_id),
                passed_testcase: Set(candidate.passed_testcase),
                score: Set(candidate.score),
                submitted_at: Set(candidate.submitted_at),
                updated_at: Set(now),
                ..Default::default()
            };
            row.insert(conn).await?;
            info!(
                assignment_user_id,
                problem_id = sub.problem_id,
                submission_id = candidate.submission_id,
                "Recorded first best submission"
            );
        }
        Some(existing) if candidate_beats(&candidate, &existing) => {
            // The grading overlay survives replacement: it grades the
            // student's problem outcome, not one submission.
            let mut row: best_submission::ActiveModel = existing.into();
            row.submission_id = Set(candidate.submission_id);
            row.passed_testcase = Set(candidate.passed_testcase);
            row.score = Set(candidate.score);
            row.submitted_at = Set(candidate.submitted_at);
            row.updated_at = Set(now);
            row.update(conn).await?;
            info!(
                assignment_user_id,
                problem_id = sub.problem_id,
                submission_id = candidate.submission_id,
                "Replaced best submission"
            );
        }
        Some(existing) => {
            debug!(
                assignment_user_id,
                problem_id = sub.problem_id,
                submission_id = candidate.submission_id,
                current_best = existing.submission_id,
                "Candidate does not beat current best"
            );
        }
    }

    refresh_participant(conn, &participant).await?;
    Ok(())
}

/// Recompute the participant's score from their best rows and flip the
/// status to SUBMITTED once every assigned problem has one.
pub async fn refresh_participant<C: ConnectionTrait>(
    conn: &C,
    participant: &assignment_user::Model,
) -> anyhow::Result<assignment_user::Model> {
    let best_rows = best_submission::Entity::find()
        .filter(best_submission::Column::AssignmentUserId.eq(participant.id))
        .all(conn)
        .await?;

    let score: i32 = best_rows
        .iter()
        .map(|b| b.manual_score.unwrap_or(b.score))
        .sum();

    let problem_count = assignment_problem::Entity::find()
        .filter(assignment_problem::Column::AssignmentId.eq(participant.assignment_id))
        .count(conn)
        .await?;

    let all_covered = problem_count > 0 && best_rows.len() as u64 == problem_count;

    let mut row: assignment_user::ActiveModel = participant.clone().into();
    row.score = Set(score);
    if all_covered && participant.status == assignment_user::STATUS_IN_PROGRESS {
        row.status = Set(assignment_user::STATUS_SUBMITTED.to_string());
        info!(
            assignment_user_id = participant.id,
            score, "All problems covered, participant moved to SUBMITTED"
        );
    }
    Ok(row.update(conn).await?)
}
