use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The winning submission for one (student, problem) pair within an
/// assignment, plus the teacher's grading overlay.
///
/// `passed_testcase`, `score` and `submitted_at` are denormalized from the
/// winning submission so replacement comparisons never re-read it.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "best_submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "assignment_user_problem")]
    pub assignment_user_id: i32,
    #[sea_orm(unique_key = "assignment_user_problem")]
    pub problem_id: i32,

    #[sea_orm(belongs_to, from = "assignment_user_id", to = "id")]
    pub assignment_user: HasOne<super::assignment_user::Entity>,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    pub passed_testcase: i32,
    pub score: i32,
    pub submitted_at: DateTimeUtc,

    /// Grading overlay; never touches the judged verdict.
    pub manual_score: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub feedback: Option<String>,
    pub graded_by: Option<i32>,
    pub graded_at: Option<DateTimeUtc>,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
