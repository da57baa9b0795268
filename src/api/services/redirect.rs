//! QR 码跳转
//!
//! `GET /r/{code}` 不直接返回 3xx，而是返回一个极小的 HTML 页面：
//! 页面先用 sendBeacon 上报扫码事件，再跳转到目标地址。

use std::sync::Arc;

use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Serialize;
use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::api::constants::SCAN_LOG_PATH;
use crate::config::{TrackingConfig, get_config};
use crate::errors::{QrLinkerError, Result};
use crate::storage::SeaOrmStorage;
use crate::utils::short_session;

/// 解析后的跳转目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub qr_code_id: i64,
    pub code: String,
    pub destination: String,
}

/// 在目标地址后追加 `branch=<code>`
pub fn build_destination(target_url: &str, code: &str) -> String {
    let separator = if target_url.contains('?') { '&' } else { '?' };
    format!("{}{}branch={}", target_url, separator, code)
}

/// 按短码解析跳转目标
///
/// 不存在 → `NotFound`，已停用 → `Gone`
pub async fn resolve_redirect(storage: &SeaOrmStorage, code: &str) -> Result<RedirectTarget> {
    let Some(qr) = storage.find_qr_code(code).await? else {
        return Err(QrLinkerError::not_found(format!("QR code '{}' not found", code)));
    };

    if !qr.is_active {
        return Err(QrLinkerError::gone(format!("QR code '{}' deactivated", code)));
    }

    Ok(RedirectTarget {
        destination: build_destination(&qr.target_url, &qr.code),
        qr_code_id: qr.id,
        code: qr.code,
    })
}

/// 嵌入 `<script>` 的 JSON 字面量，转义 `</` 防止提前闭合标签
fn script_literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

/// `<noscript>` 链接的属性值转义
fn escape_html_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 跳转页面参数
#[derive(Debug, Clone)]
pub struct RedirectPage<'a> {
    pub qr_code_id: i64,
    pub session_id: &'a str,
    pub destination: &'a str,
    pub scan_log_url: &'a str,
    pub delay_ms: u64,
}

#[derive(Serialize)]
struct BeaconPayload<'a> {
    qr_code_id: i64,
    session_id: &'a str,
}

/// 渲染跳转页面
///
/// 先尝试 `navigator.sendBeacon`，失败时回退到 `fetch(..., {keepalive: true})`，
/// 延迟 `delay_ms` 后 `location.replace` 到目标地址。
pub fn render_redirect_page(page: &RedirectPage<'_>) -> String {
    let payload = script_literal(&BeaconPayload {
        qr_code_id: page.qr_code_id,
        session_id: page.session_id,
    });
    let endpoint = script_literal(page.scan_log_url);
    let destination = script_literal(page.destination);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<meta name="robots" content="noindex">
<title>Redirecting...</title>
</head>
<body>
<script>
(function () {{
  var payload = {payload};
  payload.user_agent = navigator.userAgent;
  var endpoint = {endpoint};
  var body = JSON.stringify(payload);
  var sent = false;
  try {{
    sent = navigator.sendBeacon(endpoint, new Blob([body], {{ type: "application/json" }}));
  }} catch (e) {{}}
  if (!sent) {{
    try {{
      fetch(endpoint, {{
        method: "POST",
        headers: {{ "Content-Type": "application/json" }},
        body: body,
        keepalive: true
      }}).catch(function () {{}});
    }} catch (e) {{}}
  }}
  setTimeout(function () {{ window.location.replace({destination}); }}, {delay});
}})();
</script>
<noscript><a href="{href}">Continue</a></noscript>
</body>
</html>"#,
        payload = payload,
        endpoint = endpoint,
        destination = destination,
        delay = page.delay_ms,
        href = escape_html_attr(page.destination),
    )
}

/// 会话 Cookie：前端脚本需要可读，跨站场景下随 beacon 发送
pub fn build_session_cookie(config: &TrackingConfig, session_id: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new(config.session_cookie_name.clone(), session_id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(false);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::None);
    cookie.set_max_age(actix_web::cookie::time::Duration::days(
        config.cookie_max_age_days,
    ));
    if let Some(domain) = config.cookie_domain.as_ref().filter(|d| !d.is_empty()) {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// 上报接口地址：配置了 public_base_url 时使用绝对地址
pub fn scan_log_url(config: &TrackingConfig) -> String {
    format!(
        "{}{}",
        config.public_base_url.trim_end_matches('/'),
        SCAN_LOG_PATH
    )
}

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        storage: web::Data<Arc<SeaOrmStorage>>,
    ) -> impl Responder {
        let code = path.into_inner();

        match resolve_redirect(storage.get_ref(), &code).await {
            Ok(target) => Self::finish_redirect(&req, target),
            Err(QrLinkerError::NotFound(msg)) => {
                debug!("{}", msg);
                Self::plain_response(StatusCode::NOT_FOUND, "QR code not found")
            }
            Err(QrLinkerError::Gone(msg)) => {
                debug!("{}", msg);
                Self::plain_response(StatusCode::GONE, "QR code deactivated")
            }
            Err(e) => {
                error!("Redirect error for '{}': {}", code, e);
                Self::plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        }
    }

    fn finish_redirect(req: &HttpRequest, target: RedirectTarget) -> HttpResponse {
        let config = get_config();
        let tracking = &config.tracking;

        let session_id = req
            .cookie(&tracking.session_cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        trace!(
            "Redirecting QR {} (session {}...) to {}",
            target.code,
            short_session(&session_id),
            target.destination
        );

        let endpoint = scan_log_url(tracking);
        let html = render_redirect_page(&RedirectPage {
            qr_code_id: target.qr_code_id,
            session_id: &session_id,
            destination: &target.destination,
            scan_log_url: &endpoint,
            delay_ms: tracking.redirect_delay_ms,
        });

        HttpResponse::Ok()
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "no-store"))
            .cookie(build_session_cookie(tracking, &session_id))
            .body(html)
    }

    #[inline]
    fn plain_response(status: StatusCode, body: &'static str) -> HttpResponse {
        HttpResponse::build(status)
            .insert_header(("Content-Type", "text/plain; charset=utf-8"))
            .body(body)
    }
}

/// Redirect 路由配置
pub fn redirect_routes() -> actix_web::Scope {
    web::scope("/r").route("/{code}", web::get().to(RedirectService::handle_redirect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_destination_separator() {
        assert_eq!(
            build_destination("https://example.com/menu", "BR01"),
            "https://example.com/menu?branch=BR01"
        );
        assert_eq!(
            build_destination("https://example.com/menu?lang=en", "BR01"),
            "https://example.com/menu?lang=en&branch=BR01"
        );
    }

    #[test]
    fn test_script_literal_escapes_closing_tag() {
        let literal = script_literal("https://evil.test/</script><script>alert(1)");
        assert!(!literal.contains("</script>"));
        assert!(literal.starts_with('"'));
    }

    #[test]
    fn test_escape_html_attr() {
        assert_eq!(
            escape_html_attr(r#"https://a.test/?x=1&y="2"<b>'c'"#),
            "https://a.test/?x=1&amp;y=&quot;2&quot;&lt;b&gt;&#39;c&#39;"
        );
    }

    #[test]
    fn test_noscript_link_is_escaped() {
        let html = render_redirect_page(&RedirectPage {
            qr_code_id: 1,
            session_id: "sess",
            destination: r#"https://a.test/"><script>x</script>?branch=B"#,
            scan_log_url: "/api/scan-log",
            delay_ms: 100,
        });
        let noscript = &html[html.find("<noscript>").unwrap()..];
        assert!(noscript.contains("&quot;&gt;&lt;script&gt;"));
        assert!(!noscript.contains("\"><script>"));
    }

    #[test]
    fn test_render_page_contains_beacon_and_fallback() {
        let html = render_redirect_page(&RedirectPage {
            qr_code_id: 42,
            session_id: "abc-123",
            destination: "https://example.com/?a=1&branch=X",
            scan_log_url: "/api/scan-log",
            delay_ms: 250,
        });
        assert!(html.contains("navigator.sendBeacon"));
        assert!(html.contains("keepalive: true"));
        assert!(html.contains(r#"{"qr_code_id":42,"session_id":"abc-123"}"#));
        assert!(html.contains(r#"window.location.replace("https://example.com/?a=1&branch=X")"#));
        assert!(html.contains("}, 250);"));
        assert!(html.contains("href=\"https://example.com/?a=1&amp;branch=X\""));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = TrackingConfig::default();
        let cookie = build_session_cookie(&config, "sess");
        assert_eq!(cookie.name(), "qr_session");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(false));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(
            cookie.max_age(),
            Some(actix_web::cookie::time::Duration::days(365))
        );
        assert!(cookie.domain().is_none());

        let config = TrackingConfig {
            cookie_domain: Some("example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_session_cookie(&config, "sess").domain(),
            Some("example.com")
        );
    }

    #[test]
    fn test_scan_log_url() {
        assert_eq!(scan_log_url(&TrackingConfig::default()), "/api/scan-log");
        let config = TrackingConfig {
            public_base_url: "https://qr.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(scan_log_url(&config), "https://qr.example.com/api/scan-log");
    }
}
