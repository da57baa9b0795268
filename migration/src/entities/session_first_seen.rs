//! First-seen record per session id
//!
//! The primary key on `session_id` is the only thing deciding whether a
//! visitor is new: whoever inserts the row first wins.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "session_first_seen")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: String,
    /// `qr_scan` or `social_click`
    pub first_action_type: String,
    pub first_branch_id: Option<i64>,
    pub first_qr_code_id: Option<i64>,
    pub first_seen_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
