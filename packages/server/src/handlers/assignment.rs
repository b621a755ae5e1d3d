use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{
    assignment, assignment_problem, assignment_user, best_submission, exam_activity_log,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::submission::{find_assignment, find_enrollment};
use crate::models::assignment::*;
use crate::state::AppState;

/// Start an assignment: NOT_STARTED -> IN_PROGRESS, freezing `max_score`
/// from the current problem points. Idempotent while IN_PROGRESS.
#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/start",
    tag = "Assignments",
    operation_id = "startAssignment",
    summary = "Start working on an assignment",
    params(
        ("id" = i32, Path, description = "Assignment ID")
    ),
    responses(
        (status = 200, description = "Assignment started", body = StartAssignmentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Assignment or enrollment not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Assignment not open (PRECONDITION_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(assignment_id = %assignment_id))]
pub async fn start_assignment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(assignment_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let asg = find_assignment(&state.db, assignment_id).await?;
    let enrollment = find_enrollment(&state.db, assignment_id, auth_user.user_id).await?;

    if asg.status == assignment::STATUS_DRAFT {
        return Err(AppError::PreconditionFailed(
            "Assignment is not published".into(),
        ));
    }
    if asg.status == assignment::STATUS_CLOSED {
        return Err(AppError::PreconditionFailed("Assignment is closed".into()));
    }
    let now = Utc::now();
    if now < asg.start_time {
        return Err(AppError::PreconditionFailed(
            "Assignment has not started yet".into(),
        ));
    }
    if now > asg.end_time && !asg.allow_late_submission {
        return Err(AppError::PreconditionFailed(
            "Assignment deadline has passed".into(),
        ));
    }

    match enrollment.status.as_str() {
        assignment_user::STATUS_IN_PROGRESS => {
            // Re-entry after a page reload; keep the original started_at.
            let started_at = enrollment.started_at.unwrap_or(now);
            Ok(Json(StartAssignmentResponse {
                assignment_id,
                status: enrollment.status,
                started_at,
                max_score: enrollment.max_score,
            }))
        }
        assignment_user::STATUS_NOT_STARTED => {
            let max_score: i32 = assignment_problem::Entity::find()
                .filter(assignment_problem::Column::AssignmentId.eq(assignment_id))
                .all(&state.db)
                .await?
                .iter()
                .map(|p| p.points)
                .sum();

            let mut row: assignment_user::ActiveModel = enrollment.into();
            row.status = Set(assignment_user::STATUS_IN_PROGRESS.to_string());
            row.started_at = Set(Some(now));
            row.max_score = Set(max_score);
            let updated = row.update(&state.db).await?;

            info!(
                assignment_id,
                user_id = auth_user.user_id,
                max_score, "Assignment started"
            );

            Ok(Json(StartAssignmentResponse {
                assignment_id,
                status: updated.status,
                started_at: now,
                max_score,
            }))
        }
        _ => Err(AppError::PreconditionFailed(
            "Assignment has already been submitted".into(),
        )),
    }
}

/// Record suspicious exam activity. Append-only; the enrollment row keeps
/// running counters for the well-known activity types.
#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/activity",
    tag = "Assignments",
    operation_id = "recordActivity",
    summary = "Record exam activity",
    params(
        ("id" = i32, Path, description = "Assignment ID")
    ),
    request_body = RecordActivityRequest,
    responses(
        (status = 204, description = "Activity recorded"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Assignment or enrollment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(assignment_id = %assignment_id))]
pub async fn record_activity(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(assignment_id): Path<i32>,
    AppJson(payload): AppJson<RecordActivityRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_record_activity(&payload)?;

    let asg = find_assignment(&state.db, assignment_id).await?;
    if asg.kind != assignment::KIND_EXAM {
        return Err(AppError::Validation(
            "Activity logging only applies to exam assignments".into(),
        ));
    }
    let enrollment = find_enrollment(&state.db, assignment_id, auth_user.user_id).await?;

    let activity_type = payload.activity_type.trim().to_string();

    let txn = state.db.begin().await?;

    let log_row = exam_activity_log::ActiveModel {
        assignment_user_id: Set(enrollment.id),
        activity_type: Set(activity_type.clone()),
        suspicion_level: Set(payload.suspicion_level),
        recorded_at: Set(Utc::now()),
        ..Default::default()
    };
    log_row.insert(&txn).await?;

    let mut row: assignment_user::ActiveModel = enrollment.clone().into();
    match activity_type.as_str() {
        exam_activity_log::ACTIVITY_TAB_SWITCH => {
            row.tab_switch_count = Set(enrollment.tab_switch_count + 1);
            row.update(&txn).await?;
        }
        exam_activity_log::ACTIVITY_AI_CAPTURE => {
            row.captured_ai_count = Set(enrollment.captured_ai_count + 1);
            row.update(&txn).await?;
        }
        _ => {}
    }

    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// List best submissions for one participant.
#[utoipa::path(
    get,
    path = "/api/v1/assignments/{id}/best-submissions",
    tag = "Assignments",
    operation_id = "listBestSubmissions",
    summary = "List per-problem best submissions",
    description = "Returns the winning submission per problem for the calling student. Teachers can inspect any student via `user_id`.",
    params(
        ("id" = i32, Path, description = "Assignment ID"),
        BestSubmissionListQuery
    ),
    responses(
        (status = 200, description = "Best submissions", body = BestSubmissionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Assignment or enrollment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(assignment_id = %assignment_id))]
pub async fn list_best_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(assignment_id): Path<i32>,
    Query(query): Query<BestSubmissionListQuery>,
) -> Result<Json<BestSubmissionListResponse>, AppError> {
    let _ = find_assignment(&state.db, assignment_id).await?;

    let target_user_id = match query.user_id {
        Some(uid) if uid != auth_user.user_id => {
            auth_user.require_teacher()?;
            uid
        }
        _ => auth_user.user_id,
    };

    let enrollment = find_enrollment(&state.db, assignment_id, target_user_id).await?;

    let best_rows = best_submission::Entity::find()
        .filter(best_submission::Column::AssignmentUserId.eq(enrollment.id))
        .all(&state.db)
        .await?;

    // Present problems in their assignment order.
    let problems = assignment_problem::Entity::find()
        .filter(assignment_problem::Column::AssignmentId.eq(assignment_id))
        .order_by_asc(assignment_problem::Column::OrderNo)
        .all(&state.db)
        .await?;

    let mut data = Vec::with_capacity(best_rows.len());
    for ap in &problems {
        let Some(best) = best_rows.iter().find(|b| b.problem_id == ap.problem_id) else {
            continue;
        };
        data.push(BestSubmissionItem {
            problem_id: best.problem_id,
            submission_id: best.submission_id,
            passed_testcase: best.passed_testcase,
            score: best.score,
            manual_score: best.manual_score,
            feedback: best.feedback.clone(),
            final_score: best.manual_score.unwrap_or(best.score),
            submitted_at: best.submitted_at,
            graded_at: best.graded_at,
        });
    }

    Ok(Json(BestSubmissionListResponse {
        assignment_id,
        user_id: target_user_id,
        status: enrollment.status,
        total_score: enrollment.score,
        max_score: enrollment.max_score,
        data,
    }))
}
