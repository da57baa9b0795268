use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QuerySelect, TransactionTrait,
};
use tracing::trace;

use super::SeaOrmStorage;
use crate::errors::{QrLinkerError, Result};
use crate::services::GeoInfo;
use crate::storage::models::{
    EventRef, NewScanEvent, NewSocialClick, PlatformCount, SocialAnalyticsFilter,
};
use migration::entities::{qr_scan, social_click};

impl SeaOrmStorage {
    /// 写入扫码事件（独立短事务），返回事件 id
    ///
    /// 地理位置字段写入 NULL，由后台任务补全。
    pub async fn insert_scan(&self, event: NewScanEvent) -> Result<i64> {
        let txn = self.db.begin().await.map_err(|e| {
            QrLinkerError::database_operation(format!("开始事务失败: {}", e))
        })?;

        let model = qr_scan::ActiveModel {
            qr_code_id: Set(event.qr_code_id),
            device_type: Set(event.device_type),
            device_name: Set(event.device_name),
            browser: Set(event.browser),
            os: Set(event.os),
            ip_address: Set(event.ip_address),
            country: Set(None),
            city: Set(None),
            region: Set(None),
            session_id: Set(event.session_id),
            is_new_user: Set(event.is_new_user),
            user_agent: Set(event.user_agent),
            scanned_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| QrLinkerError::database_operation(format!("写入扫码事件失败: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| QrLinkerError::database_operation(format!("提交事务失败: {}", e)))?;

        Ok(model.id)
    }

    /// 写入社交链接点击事件（独立短事务），返回事件 id
    pub async fn insert_social_click(&self, event: NewSocialClick) -> Result<i64> {
        let txn = self.db.begin().await.map_err(|e| {
            QrLinkerError::database_operation(format!("开始事务失败: {}", e))
        })?;

        let model = social_click::ActiveModel {
            platform: Set(event.platform),
            branch_id: Set(event.branch_id),
            device_type: Set(event.device_type),
            browser: Set(event.browser),
            os: Set(event.os),
            ip_address: Set(event.ip_address),
            country: Set(None),
            city: Set(None),
            region: Set(None),
            session_id: Set(event.session_id),
            is_new_user: Set(event.is_new_user),
            user_agent: Set(event.user_agent),
            clicked_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| QrLinkerError::database_operation(format!("写入点击事件失败: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| QrLinkerError::database_operation(format!("提交事务失败: {}", e)))?;

        Ok(model.id)
    }

    pub async fn get_scan(&self, id: i64) -> Result<Option<qr_scan::Model>> {
        Ok(qr_scan::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn get_social_click(&self, id: i64) -> Result<Option<social_click::Model>> {
        Ok(social_click::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// 为已存在的事件写入地理位置
    ///
    /// 在新事务中重新读取事件行；行已不存在（例如被清理）时返回 `Ok(false)`，
    /// 不做任何修改。
    pub async fn apply_geography(&self, target: EventRef, geo: &GeoInfo) -> Result<bool> {
        let txn = self.db.begin().await.map_err(|e| {
            QrLinkerError::database_operation(format!("开始事务失败: {}", e))
        })?;

        match target {
            EventRef::Scan(id) => {
                let Some(model) = qr_scan::Entity::find_by_id(id).one(&txn).await? else {
                    trace!("Scan #{} no longer exists, skipping geography", id);
                    return Ok(false);
                };
                let mut active = model.into_active_model();
                active.country = Set(geo.country.clone());
                active.city = Set(geo.city.clone());
                active.region = Set(geo.region.clone());
                active.update(&txn).await?;
            }
            EventRef::SocialClick(id) => {
                let Some(model) = social_click::Entity::find_by_id(id).one(&txn).await? else {
                    trace!("Social click #{} no longer exists, skipping geography", id);
                    return Ok(false);
                };
                let mut active = model.into_active_model();
                active.country = Set(geo.country.clone());
                active.city = Set(geo.city.clone());
                active.region = Set(geo.region.clone());
                active.update(&txn).await?;
            }
        }

        txn.commit()
            .await
            .map_err(|e| QrLinkerError::database_operation(format!("提交事务失败: {}", e)))?;

        Ok(true)
    }

    /// 按平台聚合社交点击数（按数量降序）
    pub async fn social_platform_counts(
        &self,
        filter: &SocialAnalyticsFilter,
    ) -> Result<Vec<PlatformCount>> {
        let mut query = social_click::Entity::find()
            .select_only()
            .column(social_click::Column::Platform)
            .column_as(social_click::Column::Id.count(), "count");

        if let Some(branch_id) = filter.branch_id {
            query = query.filter(social_click::Column::BranchId.eq(branch_id));
        }
        if let Some(start) = filter.start {
            query = query.filter(social_click::Column::ClickedAt.gte(start));
        }
        if let Some(end) = filter.end {
            query = query.filter(social_click::Column::ClickedAt.lte(end));
        }

        let rows: Vec<(String, i64)> = query
            .group_by(social_click::Column::Platform)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut counts: Vec<PlatformCount> = rows
            .into_iter()
            .map(|(platform, count)| PlatformCount { platform, count })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.platform.cmp(&b.platform)));

        Ok(counts)
    }
}
