use std::cmp;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use common::SubmissionStatus;
use common::judge_job::{JudgeJob, TestCaseSpec};
use common::limits::{LanguageLimits, PairingOverrides, ProblemLimits, effective_limits};
use common::storage::ContentHash;
use common::template::SourceTemplate;
use sea_orm::*;
use tracing::{debug, error, info, instrument, warn};

use crate::entity::{
    assignment, assignment_problem, assignment_user, dataset, language, problem, problem_language,
    submission, test_case, test_case_result,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::Pagination;
use crate::models::submission::*;
use crate::state::AppState;

/// Find a problem by ID or return 404.
pub(crate) async fn find_problem<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<problem::Model, AppError> {
    problem::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))
}

/// Find an assignment by ID or return 404.
pub(crate) async fn find_assignment<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<assignment::Model, AppError> {
    assignment::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".into()))
}

/// Find a submission by ID or return 404.
async fn find_submission<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<submission::Model, AppError> {
    submission::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))
}

/// Find the problem pairing within an assignment or return 404.
pub(crate) async fn find_assignment_problem<C: ConnectionTrait>(
    db: &C,
    assignment_id: i32,
    problem_id: i32,
) -> Result<assignment_problem::Model, AppError> {
    assignment_problem::Entity::find()
        .filter(assignment_problem::Column::AssignmentId.eq(assignment_id))
        .filter(assignment_problem::Column::ProblemId.eq(problem_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found in this assignment".into()))
}

/// Find a student's enrollment or return 404.
pub(crate) async fn find_enrollment<C: ConnectionTrait>(
    db: &C,
    assignment_id: i32,
    user_id: i32,
) -> Result<assignment_user::Model, AppError> {
    assignment_user::Entity::find()
        .filter(assignment_user::Column::AssignmentId.eq(assignment_id))
        .filter(assignment_user::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Not enrolled in this assignment".into()))
}

/// Resolve a language code against global and per-problem settings.
///
/// A disabled language or an `is_allowed = false` pairing rejects the
/// submission outright.
async fn resolve_language<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
    code: &str,
) -> Result<(language::Model, Option<problem_language::Model>), AppError> {
    let lang = language::Entity::find()
        .filter(language::Column::Code.eq(code.trim()))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Unknown language: {code}")))?;

    if !lang.enabled {
        return Err(AppError::Validation(format!(
            "Language {} is disabled",
            lang.code
        )));
    }

    let pairing = problem_language::Entity::find()
        .filter(problem_language::Column::ProblemId.eq(problem_id))
        .filter(problem_language::Column::LanguageId.eq(lang.id))
        .one(db)
        .await?;

    if let Some(ref p) = pairing {
        if !p.is_allowed {
            return Err(AppError::Validation(format!(
                "Language {} is not allowed for this problem",
                lang.code
            )));
        }
    }

    Ok((lang, pairing))
}

/// Verify the dataset belongs to the problem, or reject.
async fn resolve_dataset<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
    dataset_id: i32,
) -> Result<dataset::Model, AppError> {
    let ds = dataset::Entity::find_by_id(dataset_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Dataset not found".into()))?;

    if ds.problem_id != problem_id {
        return Err(AppError::Validation(
            "Dataset does not belong to this problem".into(),
        ));
    }
    Ok(ds)
}

/// Fetch the source blob and enforce the problem's source size limit.
async fn fetch_source(
    state: &AppState,
    source_ref: &str,
    source_limit_kb: i32,
) -> Result<String, AppError> {
    let hash = ContentHash::from_hex(source_ref.trim())?;

    let size = state.storage.size(&hash).await?;
    let limit = source_limit_kb as u64 * 1024;
    if size == 0 {
        return Err(AppError::Validation("Source must not be empty".into()));
    }
    if size > limit {
        return Err(AppError::Validation(format!(
            "Source exceeds the {source_limit_kb} KiB limit"
        )));
    }

    let bytes = state.storage.get(&hash).await?;
    String::from_utf8(bytes).map_err(|_| AppError::Validation("Source is not valid UTF-8".into()))
}

/// Enqueue a judge job for a submission. Best effort: the submission row is
/// already committed, so a publish failure leaves it Pending for a later
/// rejudge rather than failing the request.
#[instrument(skip(state, job), fields(submission_id = job.submission_id))]
async fn enqueue_judge_job(state: &AppState, job: JudgeJob) {
    let Some(ref mq) = state.mq else {
        debug!("MQ unavailable, skipping enqueue");
        return;
    };

    let job_id = job.job_id.clone();
    let test_cases = job.test_cases.len();

    match mq.publish(&state.config.mq.job_queue, None, &job, None).await {
        Ok(_) => {
            info!(job_id = %job_id, test_cases, "Judge job enqueued");
        }
        Err(e) => {
            warn!(error = %e, "Failed to enqueue judge job");
        }
    }
}

/// Assemble the judge job payload for an accepted submission: rendered
/// source, effective limits, and the dataset's test cases in order.
async fn build_judge_job<C: ConnectionTrait>(
    db: &C,
    sub: &submission::Model,
    prob: &problem::Model,
    lang: &language::Model,
    pairing: Option<&problem_language::Model>,
    rendered_source: String,
) -> Result<JudgeJob, AppError> {
    let limits = effective_limits(
        ProblemLimits {
            time_limit_ms: prob.time_limit_ms,
            memory_limit_kb: prob.memory_limit_kb,
        },
        LanguageLimits {
            time_factor: lang.default_time_factor,
            memory_kb: lang.default_memory_kb,
        },
        PairingOverrides {
            time_factor: pairing.and_then(|p| p.time_factor_override),
            memory_kb: pairing.and_then(|p| p.memory_kb_override),
        },
    );

    let test_cases: Vec<TestCaseSpec> = test_case::Entity::find()
        .filter(test_case::Column::DatasetId.eq(sub.dataset_id))
        .order_by_asc(test_case::Column::IndexNo)
        .all(db)
        .await?
        .into_iter()
        .map(|tc| TestCaseSpec {
            id: tc.id,
            index_no: tc.index_no,
            input_ref: tc.input_ref,
            output_ref: tc.output_ref,
            score: tc.score,
        })
        .collect();

    Ok(JudgeJob::new(
        sub.id,
        sub.problem_id,
        lang.code.clone(),
        rendered_source,
        limits,
        test_cases,
    ))
}

/// Shared tail of both intake paths: validate language/dataset/source,
/// persist the Pending row, and hand the job to the queue.
async fn accept_submission(
    state: &AppState,
    auth_user: &AuthUser,
    problem_id: i32,
    assignment_user_id: Option<i32>,
    payload: &CreateSubmissionRequest,
) -> Result<submission::Model, AppError> {
    validate_create_submission(payload)?;

    let prob = find_problem(&state.db, problem_id).await?;
    let (lang, pairing) = resolve_language(&state.db, problem_id, &payload.language).await?;
    let ds = resolve_dataset(&state.db, problem_id, payload.dataset_id).await?;

    let source = fetch_source(state, &payload.source_code_ref, prob.source_limit_kb).await?;

    let template = SourceTemplate::resolve(
        (
            lang.head_template.clone(),
            lang.body_template.clone(),
            lang.tail_template.clone(),
        ),
        pairing
            .as_ref()
            .map(|p| {
                (
                    p.head_template.clone(),
                    p.body_template.clone(),
                    p.tail_template.clone(),
                )
            })
            .unwrap_or((None, None, None)),
    );
    let rendered = template.render(&source);

    // No locking here: every call creates an independent row and the
    // aggregator picks the winner later.
    let new_submission = submission::ActiveModel {
        user_id: Set(auth_user.user_id),
        problem_id: Set(problem_id),
        dataset_id: Set(ds.id),
        language_id: Set(lang.id),
        assignment_user_id: Set(assignment_user_id),
        source_ref: Set(payload.source_code_ref.trim().to_string()),
        status: Set(SubmissionStatus::Pending),
        submitted_at: Set(Utc::now()),
        ..Default::default()
    };
    let model = new_submission.insert(&state.db).await?;

    match build_judge_job(&state.db, &model, &prob, &lang, pairing.as_ref(), rendered).await {
        Ok(job) => enqueue_judge_job(state, job).await,
        Err(e) => {
            error!(submission_id = model.id, error = ?e, "Failed to build judge job");
        }
    }

    Ok(model)
}

/// Build the full response, including per-case results once judged.
///
/// Students never see internal error codes; a SystemError surfaces as a
/// generic judging failure.
async fn build_submission_response(
    db: &DatabaseConnection,
    sub: submission::Model,
    show_internal: bool,
) -> Result<SubmissionResponse, AppError> {
    let test_case_results = if sub.status.is_terminal() {
        test_case_result::Entity::find()
            .filter(test_case_result::Column::SubmissionId.eq(sub.id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| TestCaseResultResponse {
                test_case_id: r.test_case_id,
                verdict: r.verdict,
                score: r.score,
                time_ms: r.time_ms,
                memory_kb: r.memory_kb,
            })
            .collect()
    } else {
        vec![]
    };

    let error_code = if show_internal {
        sub.error_code
    } else if sub.status == SubmissionStatus::SystemError {
        Some("JUDGING_FAILED".to_string())
    } else {
        None
    };

    Ok(SubmissionResponse {
        id: sub.id,
        problem_id: sub.problem_id,
        dataset_id: sub.dataset_id,
        language_id: sub.language_id,
        status: sub.status,
        passed_testcase: sub.passed_testcase,
        total_testcase: sub.total_testcase,
        score: sub.score,
        total_time: sub.total_time,
        total_memory: sub.total_memory,
        compile_output: sub.compile_output,
        error_code,
        submitted_at: sub.submitted_at,
        judged_at: sub.judged_at,
        test_case_results,
    })
}

/// Create a practice submission outside any assignment.
#[utoipa::path(
    post,
    path = "/api/v1/problems/{id}/submissions",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit a solution to a problem",
    params(
        ("id" = i32, Path, description = "Problem ID")
    ),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission accepted for judging", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Problem or dataset not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(problem_id = %problem_id))]
pub async fn create_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(problem_id): Path<i32>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let model = accept_submission(&state, &auth_user, problem_id, None, &payload).await?;
    let response = build_submission_response(&state.db, model, auth_user.is_teacher()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Create a submission inside an assignment.
#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/problems/{pid}/submissions",
    tag = "Submissions",
    operation_id = "createAssignmentSubmission",
    summary = "Submit a solution to an assignment problem",
    params(
        ("id" = i32, Path, description = "Assignment ID"),
        ("pid" = i32, Path, description = "Problem ID")
    ),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission accepted for judging", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Assignment, problem or enrollment not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Assignment not open for submissions (PRECONDITION_FAILED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(assignment_id = %assignment_id, problem_id = %problem_id))]
pub async fn create_assignment_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((assignment_id, problem_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let asg = find_assignment(&state.db, assignment_id).await?;
    let _ = find_assignment_problem(&state.db, assignment_id, problem_id).await?;
    let enrollment = find_enrollment(&state.db, assignment_id, auth_user.user_id).await?;

    if asg.status == assignment::STATUS_DRAFT {
        return Err(AppError::PreconditionFailed(
            "Assignment is not published".into(),
        ));
    }
    if asg.status == assignment::STATUS_CLOSED {
        return Err(AppError::PreconditionFailed("Assignment is closed".into()));
    }
    if Utc::now() > asg.end_time && !asg.allow_late_submission {
        return Err(AppError::PreconditionFailed(
            "Assignment deadline has passed".into(),
        ));
    }
    if enrollment.status == assignment_user::STATUS_NOT_STARTED {
        return Err(AppError::PreconditionFailed(
            "Assignment must be started before submitting".into(),
        ));
    }

    let model = accept_submission(
        &state,
        &auth_user,
        problem_id,
        Some(enrollment.id),
        &payload,
    )
    .await?;
    let response = build_submission_response(&state.db, model, auth_user.is_teacher()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// List submissions.
#[utoipa::path(
    get,
    path = "/api/v1/submissions",
    tag = "Submissions",
    operation_id = "listSubmissions",
    summary = "List submissions",
    description = "Returns a paginated list. Students see their own submissions; teachers see everyone's.",
    params(SubmissionListQuery),
    responses(
        (status = 200, description = "List of submissions", body = SubmissionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let page = cmp::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut base_select = submission::Entity::find();

    if !auth_user.is_teacher() {
        base_select = base_select.filter(submission::Column::UserId.eq(auth_user.user_id));
    }
    if let Some(pid) = query.problem_id {
        base_select = base_select.filter(submission::Column::ProblemId.eq(pid));
    }
    if let Some(aid) = query.assignment_id {
        let enrollment_ids: Vec<i32> = assignment_user::Entity::find()
            .filter(assignment_user::Column::AssignmentId.eq(aid))
            .select_only()
            .column(assignment_user::Column::Id)
            .into_tuple()
            .all(&state.db)
            .await?;
        base_select =
            base_select.filter(submission::Column::AssignmentUserId.is_in(enrollment_ids));
    }
    if let Some(status) = query.status {
        base_select = base_select.filter(submission::Column::Status.eq(status));
    }

    let total = base_select.clone().count(&state.db).await?;

    let submissions = base_select
        .order_by_desc(submission::Column::SubmittedAt)
        .order_by_desc(submission::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let data = submissions
        .into_iter()
        .map(|sub| SubmissionListItem {
            id: sub.id,
            problem_id: sub.problem_id,
            language_id: sub.language_id,
            status: sub.status,
            passed_testcase: sub.passed_testcase,
            total_testcase: sub.total_testcase,
            score: sub.score,
            submitted_at: sub.submitted_at,
        })
        .collect();
    let total_pages = total.div_ceil(per_page);

    Ok(Json(SubmissionListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

/// Get a single submission by ID. This is the status polling surface:
/// judging is asynchronous and outcomes only ever appear here.
#[utoipa::path(
    get,
    path = "/api/v1/submissions/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get submission details",
    params(
        ("id" = i32, Path, description = "Submission ID")
    ),
    responses(
        (status = 200, description = "Submission details", body = SubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(submission_id = %id))]
pub async fn get_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let sub = find_submission(&state.db, id).await?;

    if !auth_user.is_teacher() && sub.user_id != auth_user.user_id {
        return Err(AppError::NotFound("Submission not found".into())); // Prevent enumeration
    }

    let response = build_submission_response(&state.db, sub, auth_user.is_teacher()).await?;
    Ok(Json(response))
}
