//! 扫码 / 社交点击事件表迁移
//!
//! qr_scans 与 social_clicks 结构相近：设备信息在写入时确定，
//! 地理位置（country/city/region）初始为 NULL，由后台任务异步补全。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QrScans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QrScans::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QrScans::QrCodeId).big_integer().not_null())
                    .col(ColumnDef::new(QrScans::DeviceType).string_len(32).not_null())
                    .col(ColumnDef::new(QrScans::DeviceName).string_len(64).not_null())
                    .col(ColumnDef::new(QrScans::Browser).string_len(64).not_null())
                    .col(ColumnDef::new(QrScans::Os).string_len(64).not_null())
                    .col(ColumnDef::new(QrScans::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(QrScans::Country).string_len(100).null())
                    .col(ColumnDef::new(QrScans::City).string_len(100).null())
                    .col(ColumnDef::new(QrScans::Region).string_len(100).null())
                    .col(ColumnDef::new(QrScans::SessionId).string_len(64).not_null())
                    .col(ColumnDef::new(QrScans::IsNewUser).boolean().not_null())
                    .col(ColumnDef::new(QrScans::UserAgent).text().null())
                    .col(
                        ColumnDef::new(QrScans::ScannedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 单码时间序列查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_qr_scans_code_time")
                    .table(QrScans::Table)
                    .col(QrScans::QrCodeId)
                    .col(QrScans::ScannedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SocialClicks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SocialClicks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SocialClicks::Platform).string_len(32).not_null())
                    .col(ColumnDef::new(SocialClicks::BranchId).big_integer().null())
                    .col(ColumnDef::new(SocialClicks::DeviceType).string_len(32).not_null())
                    .col(ColumnDef::new(SocialClicks::Browser).string_len(64).not_null())
                    .col(ColumnDef::new(SocialClicks::Os).string_len(64).not_null())
                    .col(ColumnDef::new(SocialClicks::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(SocialClicks::Country).string_len(100).null())
                    .col(ColumnDef::new(SocialClicks::City).string_len(100).null())
                    .col(ColumnDef::new(SocialClicks::Region).string_len(100).null())
                    .col(ColumnDef::new(SocialClicks::SessionId).string_len(64).not_null())
                    .col(ColumnDef::new(SocialClicks::IsNewUser).boolean().not_null())
                    .col(ColumnDef::new(SocialClicks::UserAgent).text().null())
                    .col(
                        ColumnDef::new(SocialClicks::ClickedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按门店 + 时间范围聚合平台点击
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_social_clicks_branch_time")
                    .table(SocialClicks::Table)
                    .col(SocialClicks::BranchId)
                    .col(SocialClicks::ClickedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_social_clicks_branch_time").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SocialClicks::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_qr_scans_code_time").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QrScans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QrScans {
    #[sea_orm(iden = "qr_scans")]
    Table,
    Id,
    QrCodeId,
    DeviceType,
    DeviceName,
    Browser,
    Os,
    IpAddress,
    Country,
    City,
    Region,
    SessionId,
    IsNewUser,
    UserAgent,
    ScannedAt,
}

#[derive(DeriveIden)]
enum SocialClicks {
    #[sea_orm(iden = "social_clicks")]
    Table,
    Id,
    Platform,
    BranchId,
    DeviceType,
    Browser,
    Os,
    IpAddress,
    Country,
    City,
    Region,
    SessionId,
    IsNewUser,
    UserAgent,
    ClickedAt,
}
