use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::{info, instrument};

use crate::aggregate::refresh_participant;
use crate::database::supports_row_locks;
use crate::entity::{assignment_problem, assignment_user, best_submission};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::submission::{find_assignment, find_assignment_problem, find_enrollment};
use crate::models::grading::*;
use crate::state::AppState;

/// Set the manual grade on a student's best submission for one problem.
///
/// Overlay only: the judged verdict on the underlying submission is never
/// touched, and a later automated replacement keeps the grade.
#[utoipa::path(
    put,
    path = "/api/v1/assignments/{id}/problems/{pid}/users/{uid}/grade",
    tag = "Grading",
    operation_id = "gradeBestSubmission",
    summary = "Grade a student's best submission",
    params(
        ("id" = i32, Path, description = "Assignment ID"),
        ("pid" = i32, Path, description = "Problem ID"),
        ("uid" = i32, Path, description = "Student user ID")
    ),
    request_body = GradeRequest,
    responses(
        (status = 200, description = "Grade recorded", body = GradeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Assignment, problem, enrollment or best submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(
    skip(state, auth_user, payload),
    fields(assignment_id = %assignment_id, problem_id = %problem_id, user_id = %user_id)
)]
pub async fn grade_best_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((assignment_id, problem_id, user_id)): Path<(i32, i32, i32)>,
    AppJson(payload): AppJson<GradeRequest>,
) -> Result<Json<GradeResponse>, AppError> {
    auth_user.require_teacher()?;

    let _ = find_assignment(&state.db, assignment_id).await?;
    let pairing = find_assignment_problem(&state.db, assignment_id, problem_id).await?;
    validate_grade(&payload, pairing.points)?;

    let txn = state.db.begin().await?;

    let enrollment = find_enrollment(&txn, assignment_id, user_id).await?;

    let mut participant_query = assignment_user::Entity::find_by_id(enrollment.id);
    if supports_row_locks(&txn) {
        participant_query = participant_query.lock(LockType::Update);
    }
    let participant = participant_query
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Not enrolled in this assignment".into()))?;

    let best = best_submission::Entity::find()
        .filter(best_submission::Column::AssignmentUserId.eq(participant.id))
        .filter(best_submission::Column::ProblemId.eq(problem_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("No best submission to grade".into()))?;

    let now = Utc::now();
    let submission_id = best.submission_id;

    let mut row: best_submission::ActiveModel = best.into();
    row.manual_score = Set(Some(payload.manual_score));
    row.feedback = Set(payload.feedback.clone());
    row.graded_by = Set(Some(auth_user.user_id));
    row.graded_at = Set(Some(now));
    row.updated_at = Set(now);
    row.update(&txn).await?;

    let refreshed = refresh_participant(&txn, &participant)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    // Graded once every assigned problem carries a final score, which means
    // a best row exists for each of them.
    let problem_count = assignment_problem::Entity::find()
        .filter(assignment_problem::Column::AssignmentId.eq(assignment_id))
        .count(&txn)
        .await?;
    let best_count = best_submission::Entity::find()
        .filter(best_submission::Column::AssignmentUserId.eq(participant.id))
        .count(&txn)
        .await?;

    let refreshed = if problem_count > 0
        && best_count == problem_count
        && refreshed.status != assignment_user::STATUS_GRADED
    {
        let mut row: assignment_user::ActiveModel = refreshed.into();
        row.status = Set(assignment_user::STATUS_GRADED.to_string());
        row.update(&txn).await?
    } else {
        refreshed
    };

    txn.commit().await?;

    info!(
        submission_id,
        manual_score = payload.manual_score,
        graded_by = auth_user.user_id,
        "Best submission graded"
    );

    Ok(Json(GradeResponse {
        assignment_id,
        problem_id,
        user_id,
        submission_id,
        manual_score: payload.manual_score,
        feedback: payload.feedback,
        graded_at: now,
        assignment_status: refreshed.status,
        total_score: refreshed.score,
    }))
}
