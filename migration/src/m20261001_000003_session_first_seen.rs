//! session_first_seen 表迁移
//!
//! session_id 作为主键：新老用户判定完全依赖该唯一约束，
//! 应用层不做任何先查后插。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SessionFirstSeen::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionFirstSeen::SessionId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SessionFirstSeen::FirstActionType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionFirstSeen::FirstBranchId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SessionFirstSeen::FirstQrCodeId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SessionFirstSeen::FirstSeenAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionFirstSeen::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 过期清理按 created_at 范围删除
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_session_first_seen_created_at")
                    .table(SessionFirstSeen::Table)
                    .col(SessionFirstSeen::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_session_first_seen_created_at")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SessionFirstSeen::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SessionFirstSeen {
    #[sea_orm(iden = "session_first_seen")]
    Table,
    SessionId,
    FirstActionType,
    FirstBranchId,
    FirstQrCodeId,
    FirstSeenAt,
    CreatedAt,
}
