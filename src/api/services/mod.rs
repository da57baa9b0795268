pub mod redirect;
pub mod social_analytics;
pub mod tracking;

pub use redirect::{RedirectService, redirect_routes};
pub use social_analytics::SocialAnalyticsService;
pub use tracking::TrackingService;

use actix_web::web;

use crate::api::constants::API_SCOPE;

/// 上报与查询接口
pub fn api_routes() -> actix_web::Scope {
    web::scope(API_SCOPE)
        .route("/scan-log", web::post().to(TrackingService::log_scan))
        .route("/social-click", web::post().to(TrackingService::log_social_click))
        .route(
            "/social-analytics",
            web::get().to(SocialAnalyticsService::get_social_analytics),
        )
}
