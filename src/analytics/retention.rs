//! Session 首次记录清理任务
//!
//! 按 created_at 删除过期的 session_first_seen 记录，与实时分类互不影响。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

use crate::errors::{QrLinkerError, Result};
use crate::storage::SeaOrmStorage;

/// 首次运行前的延迟
const INITIAL_DELAY_SECS: u64 = 300;

/// 计算 `now - days` 的截止时间，超出时间范围时返回校验错误
fn retention_cutoff(now: DateTime<Utc>, days: u64) -> Result<DateTime<Utc>> {
    i64::try_from(days)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| {
            QrLinkerError::validation(format!("retention days out of range: {}", days))
        })
}

/// Session 清理任务
pub struct SessionRetentionTask {
    storage: Arc<SeaOrmStorage>,
    /// 默认保留天数
    retention_days: u64,
}

impl SessionRetentionTask {
    pub fn new(storage: Arc<SeaOrmStorage>, retention_days: u64) -> Self {
        Self {
            storage,
            retention_days,
        }
    }

    /// 删除早于 `days` 天的记录，返回删除数量
    pub async fn run_cleanup(&self, days: u64) -> Result<u64> {
        let cutoff = retention_cutoff(Utc::now(), days)?;
        let deleted = self.storage.purge_first_seen_before(cutoff).await?;
        info!(
            "Cleaned up {} old sessions (older than {} days)",
            deleted, days
        );
        Ok(deleted)
    }

    /// 使用默认保留天数清理
    pub async fn run_default_cleanup(&self) -> Result<u64> {
        self.run_cleanup(self.retention_days).await
    }

    /// 启动后台清理任务
    ///
    /// 每隔 `interval_hours` 小时运行一次，0 表示不启动
    pub fn spawn_background_task(self: Arc<Self>, interval_hours: u64) {
        if interval_hours == 0 {
            info!("Session cleanup background task disabled");
            return;
        }

        let retention_days = self.retention_days;
        tokio::spawn(async move {
            let interval = StdDuration::from_secs(interval_hours.saturating_mul(60 * 60));

            tokio::time::sleep(StdDuration::from_secs(INITIAL_DELAY_SECS)).await;

            loop {
                if let Err(e) = self.run_default_cleanup().await {
                    error!("Session cleanup task failed: {}", e);
                }

                tokio::time::sleep(interval).await;
            }
        });

        info!(
            "Session cleanup background task started (interval: {} hours, retention: {} days)",
            interval_hours, retention_days
        );
    }
}
