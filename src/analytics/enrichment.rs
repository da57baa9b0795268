//! 地理位置后台补全
//!
//! 事件写入后立即响应请求，地理位置由这里异步解析并回写。
//! 任务通过无界 mpsc 通道提交，调度循环为每个任务 spawn 一个独立的 tokio 任务，
//! 任务之间不保证顺序。所有失败只记录日志，不重试。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::services::GeoIpProvider;
use crate::storage::{EventRef, SeaOrmStorage};

/// 一个待补全的事件
#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub target: EventRef,
    pub ip: String,
}

/// 补全任务队列（发送端）
///
/// 提交不会阻塞；调度器退出后提交的任务会被丢弃并记录警告。
#[derive(Clone)]
pub struct EnrichmentQueue {
    sender: mpsc::UnboundedSender<EnrichmentJob>,
}

impl EnrichmentQueue {
    /// 启动调度循环，返回队列句柄
    ///
    /// 调度循环在所有队列句柄被 drop 后退出。
    pub fn start(
        storage: Arc<SeaOrmStorage>,
        geoip: GeoIpProvider,
        lookup_timeout: Duration,
    ) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<EnrichmentJob>();
        let provider_name = geoip.provider_name();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let storage = storage.clone();
                let geoip = geoip.clone();
                tokio::spawn(async move {
                    enrich_event(&storage, &geoip, job.target, &job.ip, lookup_timeout).await;
                });
            }
            debug!("Enrichment dispatcher stopped");
        });

        info!(
            "Enrichment dispatcher started (provider: {}, timeout: {}ms)",
            provider_name,
            lookup_timeout.as_millis()
        );

        Self { sender }
    }

    /// 提交补全任务，立即返回
    pub fn schedule(&self, target: EventRef, ip: impl Into<String>) {
        let job = EnrichmentJob {
            target,
            ip: ip.into(),
        };
        if let Err(e) = self.sender.send(job) {
            warn!(
                "Enrichment dispatcher unavailable, dropping {} #{}",
                e.0.target.kind(),
                e.0.target.id()
            );
        }
    }
}

/// 解析地理位置并回写到事件行
///
/// 查询超时或无结果时不做任何修改；事件行已不存在时静默跳过。
pub async fn enrich_event(
    storage: &SeaOrmStorage,
    geoip: &GeoIpProvider,
    target: EventRef,
    ip: &str,
    lookup_timeout: Duration,
) {
    let geo = match tokio::time::timeout(lookup_timeout, geoip.lookup(ip)).await {
        Ok(Some(geo)) => geo,
        Ok(None) => {
            trace!("No geography for {} ({} #{})", ip, target.kind(), target.id());
            return;
        }
        Err(_) => {
            warn!(
                "GeoIP lookup for {} timed out after {}ms ({} #{})",
                ip,
                lookup_timeout.as_millis(),
                target.kind(),
                target.id()
            );
            return;
        }
    };

    match storage.apply_geography(target, &geo).await {
        Ok(true) => debug!(
            "Enriched {} #{} with {:?}/{:?}",
            target.kind(),
            target.id(),
            geo.country,
            geo.city
        ),
        Ok(false) => trace!("{} #{} vanished before enrichment", target.kind(), target.id()),
        Err(e) => error!(
            "Location enrich failed for {} #{}: {}",
            target.kind(),
            target.id(),
            e
        ),
    }
}
