//! 扫码 / 社交点击事件记录
//!
//! 处理顺序：确定 session → 解析 UA → 校验外键 → 判定新用户 → 写入事件
//! （地理位置为空）→ 提交地理位置补全任务。补全任务不在请求路径上等待。

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::classifier::SessionClassifier;
use super::enrichment::EnrichmentQueue;
use crate::errors::{QrLinkerError, Result};
use crate::services::parse_device_info;
use crate::storage::{
    ActionType, EventRef, FirstSeenContext, NewScanEvent, NewSocialClick, SeaOrmStorage,
};
use crate::utils::ip::is_geo_resolvable;
use crate::utils::short_session;

/// `POST /api/scan-log` 请求体（由跳转页 beacon 发送）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanLogPayload {
    #[serde(default)]
    pub qr_code_id: Option<i64>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `POST /api/social-click` 请求体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SocialClickPayload {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub branch_code: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// 请求侧信息（来自连接和请求头，而非请求体）
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub client_ip: Option<String>,
    pub cookie_session: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRecorded {
    pub scan_id: i64,
    pub is_new_user: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocialClickRecorded {
    pub click_id: i64,
    pub is_new_user: bool,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// 确定有效 session id：请求体 > Cookie > 新生成
///
/// 返回值第二项表示是否为新生成的 id。
pub fn effective_session_id(payload: Option<&str>, cookie: Option<&str>) -> (String, bool) {
    match non_empty(payload).or(non_empty(cookie)) {
        Some(id) => (id.to_string(), false),
        None => (Uuid::new_v4().to_string(), true),
    }
}

/// 事件记录器
pub struct EventRecorder {
    storage: Arc<SeaOrmStorage>,
    classifier: SessionClassifier,
    enrichment: Option<EnrichmentQueue>,
}

impl EventRecorder {
    /// `enrichment` 为 None 时只记录事件，不做地理位置补全
    pub fn new(storage: Arc<SeaOrmStorage>, enrichment: Option<EnrichmentQueue>) -> Self {
        Self {
            classifier: SessionClassifier::new(storage.clone()),
            storage,
            enrichment,
        }
    }

    pub fn classifier(&self) -> &SessionClassifier {
        &self.classifier
    }

    /// 记录一次扫码
    pub async fn record_scan(
        &self,
        payload: ScanLogPayload,
        ctx: RequestContext,
    ) -> Result<ScanRecorded> {
        let (session_id, generated) =
            effective_session_id(payload.session_id.as_deref(), ctx.cookie_session.as_deref());
        if generated {
            warn!(
                "No session for QR {:?}, created fallback {}...",
                payload.qr_code_id,
                short_session(&session_id)
            );
        }

        let user_agent = non_empty(payload.user_agent.as_deref())
            .or(non_empty(ctx.user_agent.as_deref()))
            .map(String::from);
        let device = parse_device_info(user_agent.as_deref().unwrap_or_default());

        let qr_code_id = payload
            .qr_code_id
            .ok_or_else(|| QrLinkerError::validation("qr_code_id is required"))?;
        if !self.storage.qr_code_exists(qr_code_id).await? {
            return Err(QrLinkerError::validation(format!(
                "QR code #{} does not exist",
                qr_code_id
            )));
        }

        let is_new_user = self
            .classifier
            .classify(
                &session_id,
                ActionType::QrScan,
                FirstSeenContext::qr_code(qr_code_id),
            )
            .await;

        let scan_id = self
            .storage
            .insert_scan(NewScanEvent {
                qr_code_id,
                device_type: device.device_type,
                device_name: device.device_name,
                browser: device.browser,
                os: device.os,
                ip_address: ctx.client_ip.clone(),
                session_id: session_id.clone(),
                is_new_user,
                user_agent,
            })
            .await?;

        info!(
            "Scan #{} | QR={} session={}... new={}",
            scan_id,
            qr_code_id,
            short_session(&session_id),
            is_new_user
        );

        self.schedule_enrichment(EventRef::Scan(scan_id), ctx.client_ip.as_deref());

        Ok(ScanRecorded {
            scan_id,
            is_new_user,
        })
    }

    /// 记录一次社交链接点击
    pub async fn record_social_click(
        &self,
        payload: SocialClickPayload,
        ctx: RequestContext,
    ) -> Result<SocialClickRecorded> {
        let (session_id, generated) =
            effective_session_id(payload.session_id.as_deref(), ctx.cookie_session.as_deref());
        if generated {
            warn!(
                "No session for social click, created fallback {}...",
                short_session(&session_id)
            );
        }

        let platform = non_empty(payload.platform.as_deref())
            .unwrap_or("unknown")
            .to_string();
        let user_agent = non_empty(ctx.user_agent.as_deref()).map(String::from);
        let device = parse_device_info(user_agent.as_deref().unwrap_or_default());

        let branch_id = match non_empty(payload.branch_code.as_deref()) {
            Some(code) => self.storage.branch_id_for_code(code).await?,
            None => None,
        };

        let is_new_user = self
            .classifier
            .classify(
                &session_id,
                ActionType::SocialClick,
                FirstSeenContext::branch(branch_id),
            )
            .await;

        let click_id = self
            .storage
            .insert_social_click(NewSocialClick {
                platform: platform.clone(),
                branch_id,
                device_type: device.device_type,
                browser: device.browser,
                os: device.os,
                ip_address: ctx.client_ip.clone(),
                session_id: session_id.clone(),
                is_new_user,
                user_agent,
            })
            .await?;

        info!(
            "Social click #{} recorded: {} (session: {}...)",
            click_id,
            platform,
            short_session(&session_id)
        );

        self.schedule_enrichment(EventRef::SocialClick(click_id), ctx.client_ip.as_deref());

        Ok(SocialClickRecorded {
            click_id,
            is_new_user,
        })
    }

    fn schedule_enrichment(&self, target: EventRef, client_ip: Option<&str>) {
        let Some(queue) = &self.enrichment else {
            return;
        };
        match client_ip {
            Some(ip) if is_geo_resolvable(ip) => queue.schedule(target, ip),
            Some(ip) => debug!(
                "Skipping enrichment for {} #{}: {} is not a public address",
                target.kind(),
                target.id(),
                ip
            ),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_session_priority() {
        assert_eq!(
            effective_session_id(Some("payload"), Some("cookie")),
            ("payload".to_string(), false)
        );
        assert_eq!(
            effective_session_id(Some(""), Some("cookie")),
            ("cookie".to_string(), false)
        );
        let (generated, is_generated) = effective_session_id(None, Some("  "));
        assert!(is_generated);
        assert!(Uuid::parse_str(&generated).is_ok());
    }

    #[test]
    fn test_payload_deserialization_is_lenient() {
        let payload: ScanLogPayload = serde_json::from_str(r#"{"qr_code_id": 5}"#).unwrap();
        assert_eq!(payload.qr_code_id, Some(5));
        assert!(payload.session_id.is_none());

        let click: SocialClickPayload = serde_json::from_str("{}").unwrap();
        assert!(click.platform.is_none());
    }
}
