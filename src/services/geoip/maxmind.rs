//! MaxMind GeoLite2 数据库实现
//!
//! 使用本地 MaxMind GeoLite2-City.mmdb 文件进行 IP 地理位置查询

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use maxminddb::Reader;
use tracing::trace;

use super::provider::{GeoInfo, GeoIpLookup};

/// MaxMind GeoIP Provider
pub struct MaxMindProvider {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindProvider {
    /// 从文件路径创建 MaxMind Provider
    pub fn new(path: &str) -> Result<Self, maxminddb::MaxMindDbError> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }
}

#[async_trait]
impl GeoIpLookup for MaxMindProvider {
    async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        let ip_addr: IpAddr = ip.parse().ok()?;

        let result = self.reader.lookup(ip_addr).ok()?;
        let city: maxminddb::geoip2::City = result.decode().ok()??;

        // 国家优先英文名，缺失时退回 ISO 代码
        let country = city
            .country
            .names
            .english
            .or(city.country.iso_code)
            .map(String::from);
        let city_name = city.city.names.english.map(String::from);
        let region = city
            .subdivisions
            .first()
            .and_then(|s| s.names.english)
            .map(String::from);

        trace!(
            "MaxMind lookup for {}: country={:?}, city={:?}, region={:?}",
            ip, country, city_name, region
        );

        let geo = GeoInfo {
            country,
            city: city_name,
            region,
        };
        (!geo.is_empty()).then_some(geo)
    }

    fn name(&self) -> &'static str {
        "MaxMind"
    }
}
