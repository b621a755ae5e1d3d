use chrono::{DateTime, Utc};
use common::{CaseVerdict, SubmissionStatus};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::shared::Pagination;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    /// Dataset to judge against; must belong to the problem.
    pub dataset_id: i32,
    /// Language code (e.g., "cpp", "python").
    pub language: String,
    /// Content hash of the previously uploaded source blob.
    pub source_code_ref: String,
}

pub fn validate_create_submission(payload: &CreateSubmissionRequest) -> Result<(), AppError> {
    if payload.language.trim().is_empty() {
        return Err(AppError::Validation("Language must not be empty".into()));
    }
    if payload.source_code_ref.trim().is_empty() {
        return Err(AppError::Validation("Source ref must not be empty".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SubmissionListQuery {
    /// Page number (1-based).
    pub page: Option<u64>,
    /// Items per page (max 100).
    pub per_page: Option<u64>,
    pub problem_id: Option<i32>,
    pub assignment_id: Option<i32>,
    pub status: Option<SubmissionStatus>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TestCaseResultResponse {
    pub test_case_id: i32,
    pub verdict: CaseVerdict,
    pub score: i32,
    pub time_ms: Option<i32>,
    pub memory_kb: Option<i32>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub problem_id: i32,
    pub dataset_id: i32,
    pub language_id: i32,
    pub status: SubmissionStatus,
    pub passed_testcase: Option<i32>,
    pub total_testcase: Option<i32>,
    pub score: Option<i32>,
    pub total_time: Option<i32>,
    pub total_memory: Option<i32>,
    pub compile_output: Option<String>,
    pub error_code: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub judged_at: Option<DateTime<Utc>>,
    /// Per-case results, populated once judging reaches a terminal status.
    pub test_case_results: Vec<TestCaseResultResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionListItem {
    pub id: i32,
    pub problem_id: i32,
    pub language_id: i32,
    pub status: SubmissionStatus,
    pub passed_testcase: Option<i32>,
    pub total_testcase: Option<i32>,
    pub score: Option<i32>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionListResponse {
    pub data: Vec<SubmissionListItem>,
    pub pagination: Pagination,
}
