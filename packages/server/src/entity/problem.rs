use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const DIFFICULTY_EASY: &str = "EASY";
pub const DIFFICULTY_MEDIUM: &str = "MEDIUM";
pub const DIFFICULTY_HARD: &str = "HARD";

pub const IO_MODE_STDIO: &str = "STDIO";
pub const IO_MODE_FILE: &str = "FILE";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub code: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String, // in Markdown

    /// One of: EASY, MEDIUM, HARD
    pub difficulty: String,
    pub visibility: String,
    pub status: String,
    /// One of: STDIO, FILE
    pub io_mode: String,

    pub time_limit_ms: i32,
    pub memory_limit_kb: i32,
    pub source_limit_kb: i32,
    pub stack_limit_kb: Option<i32>,
    pub is_locked: bool,

    #[sea_orm(has_many)]
    pub datasets: HasMany<super::dataset::Entity>,
    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
