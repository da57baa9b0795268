pub mod ip;

/// 截断 session id 用于日志输出
pub fn short_session(session_id: &str) -> &str {
    match session_id.char_indices().nth(8) {
        Some((idx, _)) => &session_id[..idx],
        None => session_id,
    }
}
