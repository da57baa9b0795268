//! 外部 GeoIP API 实现
//!
//! 使用外部 HTTP API 进行 IP 地理位置查询（如 ip-api.com）
//! 内置 LRU 缓存 + Singleflight 语义，避免重复查询

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{trace, warn};
use ureq::Agent;

use super::provider::{GeoInfo, GeoIpLookup};

/// GeoIP 缓存 TTL（15 分钟）
const GEOIP_CACHE_TTL_SECS: u64 = 15 * 60;
/// GeoIP 缓存最大容量
const GEOIP_CACHE_MAX_CAPACITY: u64 = 10_000;
/// HTTP 请求超时时间
const HTTP_TIMEOUT_SECS: u64 = 2;

/// 全局 HTTP Agent（ureq 的 Agent 是 Send + Sync）
static HTTP_AGENT: OnceLock<Agent> = OnceLock::new();

fn get_agent() -> &'static Agent {
    HTTP_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

/// 外部 API GeoIP Provider
///
/// 内置 Moka 缓存：LRU 最大 10000 条，TTL 15 分钟；
/// 同一 IP 的并发请求只发一次 HTTP。
pub struct ExternalApiProvider {
    api_url_template: String,
    /// IP → GeoInfo 缓存（None 作为负缓存）
    cache: Cache<String, Option<GeoInfo>>,
}

impl ExternalApiProvider {
    /// `api_url_template` 使用 `{ip}` 作为占位符
    pub fn new(api_url_template: &str) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(GEOIP_CACHE_TTL_SECS))
            .max_capacity(GEOIP_CACHE_MAX_CAPACITY)
            .build();

        Self {
            api_url_template: api_url_template.to_string(),
            cache,
        }
    }

    /// 解析 API 响应
    ///
    /// ip-api.com: `{"status":"success","country":"Germany","city":"Munich","regionName":"Bavaria"}`
    /// 失败时: `{"status":"fail", ...}`；也兼容其他 API 的常见字段名
    fn parse_response(json: &serde_json::Value) -> Option<GeoInfo> {
        if json["status"].as_str() == Some("fail") {
            trace!("External API returned fail status");
            return None;
        }

        let pick = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| json[*k].as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let geo = GeoInfo {
            country: pick(&["country", "country_name", "countryCode", "country_code"]),
            city: pick(&["city"]),
            region: pick(&["regionName", "region_name", "region"]),
        };

        (!geo.is_empty()).then_some(geo)
    }

    /// 同步请求（在 spawn_blocking 中调用）
    fn fetch_from_api_sync(url: String) -> Option<GeoInfo> {
        let resp = match get_agent().get(&url).call() {
            Ok(r) => r,
            Err(e) => {
                warn!("GeoIP API request to \"{}\" failed: {}", url, e);
                return None;
            }
        };

        let json: serde_json::Value = match resp.into_body().read_json() {
            Ok(j) => j,
            Err(e) => {
                warn!("GeoIP API response from \"{}\" parse failed: {}", url, e);
                return None;
            }
        };

        Self::parse_response(&json)
    }

    async fn fetch_from_api(&self, ip: &str) -> Option<GeoInfo> {
        let url = self.api_url_template.replace("{ip}", ip);

        tokio::task::spawn_blocking(move || Self::fetch_from_api_sync(url))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP spawn_blocking failed: {}", e);
                None
            })
    }
}

#[async_trait]
impl GeoIpLookup for ExternalApiProvider {
    async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        // get_with 自带 singleflight 语义
        self.cache
            .get_with(ip.to_string(), async {
                trace!("GeoIP cache miss for {}, fetching from API", ip);
                self.fetch_from_api(ip).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "ExternalAPI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ip_api_success() {
        let geo = ExternalApiProvider::parse_response(&json!({
            "status": "success",
            "country": "Germany",
            "city": "Munich",
            "regionName": "Bavaria"
        }))
        .unwrap();
        assert_eq!(geo.country.as_deref(), Some("Germany"));
        assert_eq!(geo.city.as_deref(), Some("Munich"));
        assert_eq!(geo.region.as_deref(), Some("Bavaria"));
    }

    #[test]
    fn test_parse_fail_status() {
        let geo = ExternalApiProvider::parse_response(&json!({
            "status": "fail",
            "message": "private range"
        }));
        assert!(geo.is_none());
    }

    #[test]
    fn test_parse_country_code_fallback() {
        let geo = ExternalApiProvider::parse_response(&json!({"country_code": "US", "city": ""}))
            .unwrap();
        assert_eq!(geo.country.as_deref(), Some("US"));
        assert_eq!(geo.city, None);
    }

    #[test]
    fn test_parse_empty_object() {
        assert!(ExternalApiProvider::parse_response(&json!({})).is_none());
    }

    /// 依赖外部网络服务，CI 环境可能失败
    #[tokio::test]
    #[ignore]
    async fn test_external_api_provider_lookup() {
        let provider = ExternalApiProvider::new(
            "http://ip-api.com/json/{ip}?fields=status,country,city,regionName",
        );
        let first = provider.lookup("8.8.8.8").await;
        assert!(first.is_some());
        let second = provider.lookup("8.8.8.8").await;
        assert_eq!(first, second, "Cached result should match");
    }
}
