//! 社交链接点击聚合查询

use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::{QrLinkerError, Result};
use crate::storage::{PlatformCount, SeaOrmStorage, SocialAnalyticsFilter};

#[derive(Debug, Default, Deserialize)]
pub struct SocialAnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// 字符串接收，解析失败按查询失败处理
    pub branch_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SocialAnalyticsResponse {
    pub total_clicks: i64,
    pub platforms: Vec<PlatformCount>,
    pub branch_id: Option<i64>,
}

/// 解析 ISO 日期或日期时间（无时区视为 UTC）
pub fn parse_iso_datetime(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(naive.and_utc());
        }
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| QrLinkerError::date_parse(format!("invalid date: {}", value)))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl SocialAnalyticsQuery {
    /// 转换为存储层查询条件；`end_date` 包含当天（+1 天 -1 秒）
    pub fn to_filter(&self) -> Result<SocialAnalyticsFilter> {
        let start = non_empty(&self.start_date)
            .map(parse_iso_datetime)
            .transpose()?;
        let end = non_empty(&self.end_date)
            .map(parse_iso_datetime)
            .transpose()?
            .map(|end| end + Duration::days(1) - Duration::seconds(1));
        let branch_id = non_empty(&self.branch_id)
            .map(|s| {
                s.trim().parse::<i64>().map_err(|e| {
                    QrLinkerError::validation(format!("invalid branch_id '{}': {}", s, e))
                })
            })
            .transpose()?;

        Ok(SocialAnalyticsFilter {
            start,
            end,
            branch_id,
        })
    }
}

pub struct SocialAnalyticsService;

impl SocialAnalyticsService {
    /// `GET /api/social-analytics`
    pub async fn get_social_analytics(
        query: web::Query<SocialAnalyticsQuery>,
        storage: web::Data<Arc<SeaOrmStorage>>,
    ) -> impl Responder {
        match Self::collect(&query, storage.get_ref()).await {
            Ok(body) => HttpResponse::Ok().json(body),
            Err(e) => {
                error!("Analytics error: {}", e);
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({"error": "Failed to get analytics"}))
            }
        }
    }

    async fn collect(
        query: &SocialAnalyticsQuery,
        storage: &SeaOrmStorage,
    ) -> Result<SocialAnalyticsResponse> {
        let filter = query.to_filter()?;
        let platforms = storage.social_platform_counts(&filter).await?;
        Ok(SocialAnalyticsResponse {
            total_clicks: platforms.iter().map(|p| p.count).sum(),
            platforms,
            branch_id: filter.branch_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_date_only() {
        let dt = parse_iso_datetime("2026-03-01").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2026, 3, 1, 0));
    }

    #[test]
    fn test_parse_datetime_variants() {
        assert_eq!(parse_iso_datetime("2026-03-01T10:30:00").unwrap().hour(), 10);
        assert_eq!(parse_iso_datetime("2026-03-01 10:30:00").unwrap().minute(), 30);
        assert_eq!(
            parse_iso_datetime("2026-03-01T10:30:00+02:00").unwrap().hour(),
            8
        );
        assert!(parse_iso_datetime("yesterday").is_err());
    }

    #[test]
    fn test_end_date_is_inclusive() {
        let query = SocialAnalyticsQuery {
            end_date: Some("2026-03-01".to_string()),
            ..Default::default()
        };
        let end = query.to_filter().unwrap().end.unwrap();
        assert_eq!((end.day(), end.hour(), end.minute(), end.second()), (1, 23, 59, 59));
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let query = SocialAnalyticsQuery {
            start_date: Some("  ".to_string()),
            end_date: Some(String::new()),
            branch_id: Some(" ".to_string()),
        };
        let filter = query.to_filter().unwrap();
        assert!(filter.start.is_none() && filter.end.is_none() && filter.branch_id.is_none());
    }

    #[test]
    fn test_invalid_branch_id_is_an_error() {
        let query = SocialAnalyticsQuery {
            branch_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(query.to_filter().is_err());
    }
}
