//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use qrlinker::config::DatabaseConfig;
use qrlinker::services::{GeoInfo, GeoIpLookup};
use qrlinker::storage::SeaOrmStorage;

/// 创建临时 SQLite 存储（已运行迁移）
///
/// 返回的 TempDir 需要在测试期间保持存活
pub async fn setup_storage() -> (TempDir, Arc<SeaOrmStorage>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("qrlinker_test.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        pool_size: 8,
        timeout: 10,
    };

    let storage = SeaOrmStorage::connect(&config)
        .await
        .expect("Failed to create storage");
    (temp_dir, Arc::new(storage))
}

pub fn munich() -> GeoInfo {
    GeoInfo {
        country: Some("Germany".to_string()),
        city: Some("Munich".to_string()),
        region: Some("Bavaria".to_string()),
    }
}

/// 固定返回结果，可配置延迟
pub struct FixedLookup {
    pub geo: GeoInfo,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FixedLookup {
    pub fn new(geo: GeoInfo) -> Self {
        Self::with_delay(geo, Duration::ZERO)
    }

    pub fn with_delay(geo: GeoInfo, delay: Duration) -> Self {
        Self {
            geo,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoIpLookup for FixedLookup {
    async fn lookup(&self, _ip: &str) -> Option<GeoInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Some(self.geo.clone())
    }

    fn name(&self) -> &'static str {
        "Fixed"
    }
}

/// 永不返回
pub struct HangingLookup;

#[async_trait]
impl GeoIpLookup for HangingLookup {
    async fn lookup(&self, _ip: &str) -> Option<GeoInfo> {
        std::future::pending::<Option<GeoInfo>>().await
    }

    fn name(&self) -> &'static str {
        "Hanging"
    }
}

/// 总是失败
pub struct FailingLookup;

#[async_trait]
impl GeoIpLookup for FailingLookup {
    async fn lookup(&self, _ip: &str) -> Option<GeoInfo> {
        None
    }

    fn name(&self) -> &'static str {
        "Failing"
    }
}

/// 轮询直到条件满足或超时
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
