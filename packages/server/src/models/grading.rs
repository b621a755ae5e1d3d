use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GradeRequest {
    pub manual_score: i32,
    pub feedback: Option<String>,
}

pub fn validate_grade(payload: &GradeRequest, max_points: i32) -> Result<(), AppError> {
    if payload.manual_score < 0 {
        return Err(AppError::Validation(
            "Manual score must not be negative".into(),
        ));
    }
    if payload.manual_score > max_points {
        return Err(AppError::Validation(format!(
            "Manual score exceeds problem points ({} > {max_points})",
            payload.manual_score
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GradeResponse {
    pub assignment_id: i32,
    pub problem_id: i32,
    pub user_id: i32,
    pub submission_id: i32,
    pub manual_score: i32,
    pub feedback: Option<String>,
    pub graded_at: DateTime<Utc>,
    /// Student's assignment status after grading.
    pub assignment_status: String,
    /// Student's recomputed total score.
    pub total_score: i32,
}
