use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_NOT_STARTED: &str = "NOT_STARTED";
pub const STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
pub const STATUS_SUBMITTED: &str = "SUBMITTED";
pub const STATUS_GRADED: &str = "GRADED";

/// One student's enrollment in one assignment. The aggregator serializes
/// best-submission updates by locking this row.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignment_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "assignment_user")]
    pub assignment_id: i32,
    #[sea_orm(unique_key = "assignment_user")]
    pub user_id: i32,

    #[sea_orm(belongs_to, from = "assignment_id", to = "id")]
    pub assignment: HasOne<super::assignment::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// One of: NOT_STARTED, IN_PROGRESS, SUBMITTED, GRADED
    pub status: String,
    pub started_at: Option<DateTimeUtc>,

    /// Sum over best submissions, manual grades taking precedence
    pub score: i32,
    /// Sum of assignment problem points, frozen when the student starts
    pub max_score: i32,

    pub tab_switch_count: i32,
    pub captured_ai_count: i32,
}

impl ActiveModelBehavior for ActiveModel {}
