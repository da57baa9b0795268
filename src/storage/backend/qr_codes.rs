use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QuerySelect};

use super::SeaOrmStorage;
use crate::errors::{QrLinkerError, Result};
use crate::storage::models::QrCode;
use migration::entities::qr_code;

fn model_to_qr_code(model: qr_code::Model) -> QrCode {
    QrCode {
        id: model.id,
        code: model.code,
        target_url: model.target_url,
        is_active: model.is_active,
        branch_id: model.branch_id,
    }
}

impl SeaOrmStorage {
    /// 按短码查询 QR 码
    pub async fn find_qr_code(&self, code: &str) -> Result<Option<QrCode>> {
        let model = qr_code::Entity::find()
            .filter(qr_code::Column::Code.eq(code))
            .one(&self.db)
            .await
            .map_err(|e| {
                QrLinkerError::database_operation(format!("查询 QR 码 '{}' 失败: {}", code, e))
            })?;

        Ok(model.map(model_to_qr_code))
    }

    /// QR 码 id 是否存在
    pub async fn qr_code_exists(&self, id: i64) -> Result<bool> {
        let found: Option<i64> = qr_code::Entity::find_by_id(id)
            .select_only()
            .column(qr_code::Column::Id)
            .into_tuple()
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }

    /// 根据短码解析所属门店 id（短码不存在或未绑定门店时为 None）
    pub async fn branch_id_for_code(&self, code: &str) -> Result<Option<i64>> {
        let branch: Option<Option<i64>> = qr_code::Entity::find()
            .select_only()
            .column(qr_code::Column::BranchId)
            .filter(qr_code::Column::Code.eq(code))
            .into_tuple()
            .one(&self.db)
            .await?;
        Ok(branch.flatten())
    }

    /// 写入 QR 码（用于初始化数据和测试）
    pub async fn create_qr_code(
        &self,
        code: &str,
        target_url: &str,
        is_active: bool,
        branch_id: Option<i64>,
    ) -> Result<QrCode> {
        let model = qr_code::ActiveModel {
            code: Set(code.to_string()),
            target_url: Set(target_url.to_string()),
            is_active: Set(is_active),
            branch_id: Set(branch_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            QrLinkerError::database_operation(format!("写入 QR 码 '{}' 失败: {}", code, e))
        })?;

        Ok(model_to_qr_code(model))
    }
}
