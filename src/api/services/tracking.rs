//! 事件上报接口
//!
//! 请求体按原始字节解析：sendBeacon 发出的 Blob 不一定带正确的 Content-Type。
//! 这两个接口始终返回 HTTP 200，失败时响应体为 `{"status":"error"}`。

use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::analytics::{EventRecorder, RequestContext, ScanLogPayload, SocialClickPayload};
use crate::config::get_config;
use crate::utils::ip::extract_client_ip;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScanLogResponse {
    Success { scan_id: i64, is_new_user: bool },
    Error,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SocialClickResponse {
    Success { is_new_user: bool },
    Error,
}

/// 从请求中收集 IP、Cookie、User-Agent
pub fn request_context(req: &HttpRequest) -> RequestContext {
    let config = get_config();
    RequestContext {
        client_ip: extract_client_ip(req, &config.server.trusted_proxies),
        cookie_session: req
            .cookie(&config.tracking.session_cookie_name)
            .map(|c| c.value().to_string()),
        user_agent: req
            .headers()
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(String::from),
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8], endpoint: &str) -> Option<T> {
    match serde_json::from_slice::<T>(body) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Invalid {} payload ({} bytes): {}", endpoint, body.len(), e);
            None
        }
    }
}

pub struct TrackingService;

impl TrackingService {
    /// `POST /api/scan-log`
    pub async fn log_scan(
        req: HttpRequest,
        body: web::Bytes,
        recorder: web::Data<Arc<EventRecorder>>,
    ) -> impl Responder {
        let Some(payload) = parse_body::<ScanLogPayload>(&body, "scan-log") else {
            return HttpResponse::Ok().json(ScanLogResponse::Error);
        };

        let response = match recorder.record_scan(payload, request_context(&req)).await {
            Ok(recorded) => ScanLogResponse::Success {
                scan_id: recorded.scan_id,
                is_new_user: recorded.is_new_user,
            },
            Err(e) => {
                error!("Scan log error: {}", e);
                ScanLogResponse::Error
            }
        };

        HttpResponse::Ok().json(response)
    }

    /// `POST /api/social-click`
    pub async fn log_social_click(
        req: HttpRequest,
        body: web::Bytes,
        recorder: web::Data<Arc<EventRecorder>>,
    ) -> impl Responder {
        let Some(payload) = parse_body::<SocialClickPayload>(&body, "social-click") else {
            return HttpResponse::Ok().json(SocialClickResponse::Error);
        };

        let response = match recorder
            .record_social_click(payload, request_context(&req))
            .await
        {
            Ok(recorded) => SocialClickResponse::Success {
                is_new_user: recorded.is_new_user,
            },
            Err(e) => {
                error!("Error logging social click: {}", e);
                SocialClickResponse::Error
            }
        };

        HttpResponse::Ok().json(response)
    }
}
