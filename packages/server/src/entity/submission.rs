use common::SubmissionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    pub dataset_id: i32,
    #[sea_orm(belongs_to, from = "dataset_id", to = "id")]
    pub dataset: HasOne<super::dataset::Entity>,

    pub language_id: i32,
    #[sea_orm(belongs_to, from = "language_id", to = "id")]
    pub language: HasOne<super::language::Entity>,

    /// NULL for practice submissions outside any assignment.
    pub assignment_user_id: Option<i32>,
    #[sea_orm(belongs_to, from = "assignment_user_id", to = "id")]
    pub assignment_user: Option<super::assignment_user::Entity>,

    /// Content hash of the source blob
    pub source_ref: String,

    pub status: SubmissionStatus,

    /// Verdict fields, written exactly once when judging completes.
    pub passed_testcase: Option<i32>,
    pub total_testcase: Option<i32>,
    pub score: Option<i32>,
    /// Maximum wall time across cases, milliseconds
    pub total_time: Option<i32>,
    /// Maximum memory across cases, kilobytes
    pub total_memory: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub compile_output: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,

    pub submitted_at: DateTimeUtc,
    pub judged_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
