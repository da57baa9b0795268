//! IP 地址处理工具
//!
//! 提供统一的客户端 IP 提取功能，支持：
//! - 可信代理配置（trusted_proxies）
//! - CIDR 匹配
//! - 私有 IP 自动检测

use std::net::IpAddr;

use actix_web::HttpRequest;
use tracing::trace;

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            // - fc00::/7 (ULA) / fe80::/10 (link-local) / ::1
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// 地址能否用于 GeoIP 查询（可解析且为公网地址）
pub fn is_geo_resolvable(ip: &str) -> bool {
    ip.parse::<IpAddr>()
        .map(|addr| !is_private_or_local(&addr))
        .unwrap_or(false)
}

/// 检查 IP 是否在可信代理列表中
pub fn is_trusted_proxy(ip: &IpAddr, trusted_proxies: &[String]) -> bool {
    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(ip, proxy)
        } else {
            proxy.parse::<IpAddr>().is_ok_and(|p| p == *ip)
        }
    })
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };

    let Ok(prefix_len): Result<u8, _> = prefix_len.parse() else {
        return false;
    };

    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            (u32::from_be_bytes(ip.octets()) & mask) == (u32::from_be_bytes(net.octets()) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            (u128::from_be_bytes(ip.octets()) & mask) == (u128::from_be_bytes(net.octets()) & mask)
        }
        _ => false,
    }
}

/// 从请求中提取真实客户端 IP
///
/// 策略：
/// 1. 显式配置 trusted_proxies 且对端匹配 → 使用 X-Forwarded-For / X-Real-IP
/// 2. 未配置 trusted_proxies 且对端为私有地址 → 视为反向代理，同上
/// 3. 其他情况 → 使用对端地址（公网直连，防止伪造）
pub fn extract_client_ip(req: &HttpRequest, trusted_proxies: &[String]) -> Option<String> {
    let peer = req.peer_addr().map(|addr| addr.ip());

    let behind_proxy = match peer {
        Some(ref ip) if trusted_proxies.is_empty() => is_private_or_local(ip),
        Some(ref ip) => is_trusted_proxy(ip, trusted_proxies),
        None => false,
    };

    if behind_proxy && let Some(forwarded) = forwarded_ip(req) {
        trace!("Using forwarded client IP {} (peer {:?})", forwarded, peer);
        return Some(forwarded);
    }

    peer.map(|ip| ip.to_string())
}

fn forwarded_ip(req: &HttpRequest) -> Option<String> {
    let headers = req.headers();

    if let Some(xff) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok())
        && let Some(first) = xff.split(',').map(str::trim).find(|s| !s.is_empty())
        && first.parse::<IpAddr>().is_ok()
    {
        return Some(first.to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| s.parse::<IpAddr>().is_ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_private_detection() {
        assert!(is_private_or_local(&"10.1.2.3".parse().unwrap()));
        assert!(is_private_or_local(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"fd00::1".parse().unwrap()));
        assert!(!is_private_or_local(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_or_local(&"2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_is_geo_resolvable() {
        assert!(is_geo_resolvable("1.1.1.1"));
        assert!(!is_geo_resolvable("192.168.0.10"));
        assert!(!is_geo_resolvable("not-an-ip"));
        assert!(!is_geo_resolvable(""));
    }

    #[test]
    fn test_cidr() {
        let ip: IpAddr = "192.168.1.77".parse().unwrap();
        assert!(ip_in_cidr(&ip, "192.168.1.0/24"));
        assert!(!ip_in_cidr(&ip, "192.168.2.0/24"));
        assert!(!ip_in_cidr(&ip, "192.168.1.0/33"));
        assert!(!ip_in_cidr(&ip, "::/0"));
    }

    #[test]
    fn test_direct_public_peer_ignores_forwarded_header() {
        let req = TestRequest::default()
            .peer_addr("203.0.113.9:5555".parse().unwrap())
            .insert_header(("X-Forwarded-For", "1.2.3.4"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req, &[]), Some("203.0.113.9".to_string()));
    }

    #[test]
    fn test_private_peer_uses_forwarded_header() {
        let req = TestRequest::default()
            .peer_addr("10.0.0.2:5555".parse().unwrap())
            .insert_header(("X-Forwarded-For", "1.2.3.4, 10.0.0.1"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req, &[]), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn test_explicit_trusted_proxy() {
        let trusted = vec!["203.0.113.0/24".to_string()];
        let req = TestRequest::default()
            .peer_addr("203.0.113.9:5555".parse().unwrap())
            .insert_header(("X-Real-IP", "5.6.7.8"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req, &trusted), Some("5.6.7.8".to_string()));

        // 配置了显式列表后，私有地址不再自动视为代理
        let req = TestRequest::default()
            .peer_addr("10.0.0.2:5555".parse().unwrap())
            .insert_header(("X-Real-IP", "5.6.7.8"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req, &trusted), Some("10.0.0.2".to_string()));
    }
}
