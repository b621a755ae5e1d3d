use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const KIND_SAMPLE: &str = "SAMPLE";
pub const KIND_HIDDEN: &str = "HIDDEN";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dataset")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    /// One of: SAMPLE, HIDDEN
    pub kind: String,
    pub name: String,

    #[sea_orm(has_many)]
    pub test_cases: HasMany<super::test_case::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
