//! User-Agent 解析
//!
//! 基于 woothee 的纯函数解析，无 I/O；无法识别的输入统一归为 "unknown"。

use woothee::parser::Parser;

const UNKNOWN: &str = "unknown";

/// 设备信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// mobile / tablet / desktop / bot / unknown
    pub device_type: String,
    /// 厂商（Apple、Samsung…），未知时为 "unknown"
    pub device_name: String,
    pub browser: String,
    pub os: String,
}

impl DeviceInfo {
    fn unknown() -> Self {
        Self {
            device_type: UNKNOWN.to_string(),
            device_name: UNKNOWN.to_string(),
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
        }
    }
}

fn known(value: &str) -> Option<String> {
    (!value.is_empty() && value != "UNKNOWN").then(|| value.to_string())
}

/// 平板在 woothee 中归类为 smartphone，需要根据 UA / OS 区分
fn is_tablet(ua: &str, os: &str) -> bool {
    let lower = ua.to_ascii_lowercase();
    os == "iPad" || lower.contains("ipad") || lower.contains("tablet")
        || (lower.contains("android") && !lower.contains("mobile"))
}

/// 解析 User-Agent 字符串
pub fn parse_device_info(user_agent: &str) -> DeviceInfo {
    if user_agent.trim().is_empty() {
        return DeviceInfo::unknown();
    }

    let Some(result) = Parser::new().parse(user_agent) else {
        return DeviceInfo::unknown();
    };

    let device_type = match result.category {
        "smartphone" | "mobilephone" if is_tablet(user_agent, result.os) => "tablet",
        "smartphone" | "mobilephone" => "mobile",
        "pc" => "desktop",
        "crawler" => "bot",
        "appliance" => "appliance",
        _ => UNKNOWN,
    };

    DeviceInfo {
        device_type: device_type.to_string(),
        device_name: known(result.vendor).unwrap_or_else(|| UNKNOWN.to_string()),
        browser: known(result.name).unwrap_or_else(|| UNKNOWN.to_string()),
        os: known(result.os).unwrap_or_else(|| UNKNOWN.to_string()),
    }
}
