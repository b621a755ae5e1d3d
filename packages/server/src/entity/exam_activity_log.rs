use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ACTIVITY_TAB_SWITCH: &str = "TAB_SWITCH";
pub const ACTIVITY_AI_CAPTURE: &str = "AI_CAPTURE";

/// Append-only log of suspicious activity during exam assignments. Rows are
/// never updated or deleted.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exam_activity_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub assignment_user_id: i32,
    #[sea_orm(belongs_to, from = "assignment_user_id", to = "id")]
    pub assignment_user: HasOne<super::assignment_user::Entity>,

    /// e.g. TAB_SWITCH, AI_CAPTURE
    pub activity_type: String,
    pub suspicion_level: i32,

    pub recorded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
