use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StartAssignmentResponse {
    pub assignment_id: i32,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub max_score: i32,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RecordActivityRequest {
    /// e.g. TAB_SWITCH, AI_CAPTURE
    pub activity_type: String,
    /// 0 (benign) to 10 (certain misconduct).
    pub suspicion_level: i32,
}

pub fn validate_record_activity(payload: &RecordActivityRequest) -> Result<(), AppError> {
    if payload.activity_type.trim().is_empty() {
        return Err(AppError::Validation(
            "Activity type must not be empty".into(),
        ));
    }
    if !(0..=10).contains(&payload.suspicion_level) {
        return Err(AppError::Validation(
            "Suspicion level must be between 0 and 10".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BestSubmissionListQuery {
    /// Another student's ID; requires the teacher role.
    pub user_id: Option<i32>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BestSubmissionItem {
    pub problem_id: i32,
    pub submission_id: i32,
    pub passed_testcase: i32,
    /// Automated score from judging.
    pub score: i32,
    pub manual_score: Option<i32>,
    pub feedback: Option<String>,
    /// Manual score when graded, automated score otherwise.
    pub final_score: i32,
    pub submitted_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BestSubmissionListResponse {
    pub assignment_id: i32,
    pub user_id: i32,
    pub status: String,
    pub total_score: i32,
    pub max_score: i32,
    pub data: Vec<BestSubmissionItem>,
}
