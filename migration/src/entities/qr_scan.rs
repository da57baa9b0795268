//! QR scan event entity
//!
//! Geography columns stay NULL until the enrichment worker patches them.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "qr_scans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub qr_code_id: i64,
    pub device_type: String,
    pub device_name: String,
    pub browser: String,
    pub os: String,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub session_id: String,
    pub is_new_user: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    pub scanned_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
