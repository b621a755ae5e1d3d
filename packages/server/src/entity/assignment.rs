use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const KIND_HOMEWORK: &str = "HOMEWORK";
pub const KIND_EXAM: &str = "EXAM";
pub const KIND_PRACTICE: &str = "PRACTICE";
pub const KIND_CONTEST: &str = "CONTEST";

pub const STATUS_DRAFT: &str = "DRAFT";
pub const STATUS_PUBLISHED: &str = "PUBLISHED";
pub const STATUS_CLOSED: &str = "CLOSED";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub class_id: i32,
    #[sea_orm(belongs_to, from = "class_id", to = "id")]
    pub class: HasOne<super::class::Entity>,

    pub title: String,
    /// One of: HOMEWORK, EXAM, PRACTICE, CONTEST
    pub kind: String,
    /// One of: DRAFT, PUBLISHED, CLOSED
    pub status: String,

    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
    pub total_points: i32,
    pub allow_late_submission: bool,

    #[sea_orm(has_many)]
    pub problems: HasMany<super::assignment_problem::Entity>,
    #[sea_orm(has_many)]
    pub participants: HasMany<super::assignment_user::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
