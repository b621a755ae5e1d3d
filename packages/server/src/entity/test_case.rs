use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_case")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "dataset_index")]
    pub dataset_id: i32,
    /// Position within the dataset; judging and fault reporting follow this order
    #[sea_orm(unique_key = "dataset_index")]
    pub index_no: i32,

    #[sea_orm(belongs_to, from = "dataset_id", to = "id")]
    pub dataset: HasOne<super::dataset::Entity>,

    /// Content hash of the input blob
    pub input_ref: String,
    /// Content hash of the expected output blob
    pub output_ref: String,

    pub score: i32,
}

impl ActiveModelBehavior for ActiveModel {}
