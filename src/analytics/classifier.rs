//! 新用户 / 回访用户判定
//!
//! 依赖 session_first_seen 的主键约束保证同一 session 只会被判定为新用户一次，
//! 不使用应用层锁，也不做先查后插。

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::errors::Result;
use crate::storage::{ActionType, FirstSeenContext, FirstSeenInsert, SeaOrmStorage, SessionFirstSeen};
use crate::utils::short_session;

/// Session 分类器
#[derive(Clone)]
pub struct SessionClassifier {
    storage: Arc<SeaOrmStorage>,
}

impl SessionClassifier {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 判定 session 是否首次出现
    ///
    /// 返回 true 表示本次调用写入了首次记录。存储故障不向上传播，
    /// 记录错误日志后按回访用户处理。
    pub async fn classify(
        &self,
        session_id: &str,
        action: ActionType,
        context: FirstSeenContext,
    ) -> bool {
        match self
            .storage
            .insert_first_seen(session_id, action, context)
            .await
        {
            FirstSeenInsert::Inserted => {
                info!(
                    "New user detected: session={}..., action={}",
                    short_session(session_id),
                    action
                );
                true
            }
            FirstSeenInsert::AlreadyExists => {
                debug!(
                    "Returning user: session={}... already seen, action={}",
                    short_session(session_id),
                    action
                );
                false
            }
            FirstSeenInsert::StorageFault(reason) => {
                error!(
                    "Failed to classify session {}...: {}",
                    short_session(session_id),
                    reason
                );
                false
            }
        }
    }

    /// 查询 session 的首次出现记录
    pub async fn first_seen(&self, session_id: &str) -> Result<Option<SessionFirstSeen>> {
        self.storage.get_first_seen(session_id).await
    }
}
