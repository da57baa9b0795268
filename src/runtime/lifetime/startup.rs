use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::analytics::{EnrichmentQueue, EventRecorder, SessionRetentionTask};
use crate::config::StaticConfig;
use crate::services::GeoIpProvider;
use crate::storage::{SeaOrmStorage, StorageFactory};

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub recorder: Arc<EventRecorder>,
}

/// 连接存储（含迁移），供 CLI 命令使用
pub async fn prepare_storage(config: &StaticConfig) -> Result<Arc<SeaOrmStorage>> {
    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());
    Ok(storage)
}

/// 准备服务器启动的上下文
///
/// 存储、GeoIP、地理位置补全调度器、事件记录器和会话清理任务
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = prepare_storage(config).await?;

    let enrichment = if config.analytics.enable_geo_lookup {
        let geoip = GeoIpProvider::new(&config.analytics);
        Some(EnrichmentQueue::start(
            storage.clone(),
            geoip,
            Duration::from_millis(config.analytics.lookup_timeout_ms),
        ))
    } else {
        warn!("GeoIP lookup is disabled, events will be recorded without geography");
        None
    };

    let recorder = Arc::new(EventRecorder::new(storage.clone(), enrichment));

    Arc::new(SessionRetentionTask::new(
        storage.clone(),
        config.tracking.session_retention_days,
    ))
    .spawn_background_task(config.tracking.cleanup_interval_hours);

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        storage,
        recorder,
    })
}
