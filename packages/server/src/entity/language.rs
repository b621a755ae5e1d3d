use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "language")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Short code handed to the worker (e.g., "cpp", "python")
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,

    /// Multiplier applied to problem time limits (e.g., 2.0 for Python)
    pub default_time_factor: Option<f64>,
    /// Language-wide memory limit replacing the problem limit when set
    pub default_memory_kb: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub head_template: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub body_template: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub tail_template: Option<String>,

    pub enabled: bool,
    pub display_order: i32,
}

impl ActiveModelBehavior for ActiveModel {}
