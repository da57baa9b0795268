//! API 路径常量

/// 上报接口所在 scope
pub const API_SCOPE: &str = "/api";

/// 扫码上报接口（跳转页 beacon 的目标）
pub const SCAN_LOG_PATH: &str = "/api/scan-log";
