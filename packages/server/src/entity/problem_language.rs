use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-problem language settings. A missing row means the language runs with
/// its defaults; `is_allowed = false` blocks submissions entirely.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem_language")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "problem_language")]
    pub problem_id: i32,
    #[sea_orm(unique_key = "problem_language")]
    pub language_id: i32,

    pub is_allowed: bool,

    pub time_factor_override: Option<f64>,
    pub memory_kb_override: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub head_template: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub body_template: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub tail_template: Option<String>,

    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,
    #[sea_orm(belongs_to, from = "language_id", to = "id")]
    pub language: HasOne<super::language::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
