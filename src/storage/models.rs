use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// QR 码（短码 → 目标地址）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCode {
    pub id: i64,
    pub code: String,
    pub target_url: String,
    pub is_active: bool,
    pub branch_id: Option<i64>,
}

/// 触发首次记录的动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    QrScan,
    SocialClick,
}

/// 首次出现时关联的实体（QR 码或门店）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstSeenContext {
    pub qr_code_id: Option<i64>,
    pub branch_id: Option<i64>,
}

impl FirstSeenContext {
    pub fn qr_code(qr_code_id: i64) -> Self {
        Self {
            qr_code_id: Some(qr_code_id),
            branch_id: None,
        }
    }

    pub fn branch(branch_id: Option<i64>) -> Self {
        Self {
            qr_code_id: None,
            branch_id,
        }
    }
}

/// `INSERT ... ON CONFLICT DO NOTHING` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirstSeenInsert {
    /// 本次插入成功：新用户
    Inserted,
    /// 主键已存在：回访用户
    AlreadyExists,
    /// 存储层故障
    StorageFault(String),
}

/// session_first_seen 记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFirstSeen {
    pub session_id: String,
    pub first_action_type: String,
    pub first_branch_id: Option<i64>,
    pub first_qr_code_id: Option<i64>,
    pub first_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// 待写入的扫码事件（地理位置由后台补全）
#[derive(Debug, Clone)]
pub struct NewScanEvent {
    pub qr_code_id: i64,
    pub device_type: String,
    pub device_name: String,
    pub browser: String,
    pub os: String,
    pub ip_address: Option<String>,
    pub session_id: String,
    pub is_new_user: bool,
    pub user_agent: Option<String>,
}

/// 待写入的社交链接点击事件
#[derive(Debug, Clone)]
pub struct NewSocialClick {
    pub platform: String,
    pub branch_id: Option<i64>,
    pub device_type: String,
    pub browser: String,
    pub os: String,
    pub ip_address: Option<String>,
    pub session_id: String,
    pub is_new_user: bool,
    pub user_agent: Option<String>,
}

/// 已持久化事件的引用，用于地理位置补全
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRef {
    Scan(i64),
    SocialClick(i64),
}

impl EventRef {
    pub fn id(&self) -> i64 {
        match self {
            EventRef::Scan(id) | EventRef::SocialClick(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EventRef::Scan(_) => "scan",
            EventRef::SocialClick(_) => "social_click",
        }
    }
}

/// 社交点击聚合查询条件
#[derive(Debug, Clone, Default)]
pub struct SocialAnalyticsFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub branch_id: Option<i64>,
}

/// 单个平台的点击数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformCount {
    pub platform: String,
    pub count: i64,
}
