use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, QueryFilter,
    QueryTrait, SqlErr, Statement, sea_query::OnConflict,
};

use super::SeaOrmStorage;
use crate::errors::Result;
use crate::storage::models::{ActionType, FirstSeenContext, FirstSeenInsert, SessionFirstSeen};
use migration::entities::session_first_seen;

/// 唯一约束冲突（并发下部分驱动仍可能直接报错）
fn is_conflict_error(err: &DbErr) -> bool {
    matches!(err, DbErr::RecordNotInserted)
        || matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// 构造"插入，冲突则忽略"的语句
///
/// SQLite / PostgreSQL 使用 `ON CONFLICT (session_id) DO NOTHING`；
/// MySQL 使用 `INSERT IGNORE`。两者被忽略时影响行数均为 0。
fn first_seen_insert_statement(
    backend: DbBackend,
    model: session_first_seen::ActiveModel,
) -> Statement {
    match backend {
        DbBackend::MySql => {
            let mut stmt = session_first_seen::Entity::insert(model).build(backend);
            stmt.sql = stmt.sql.replacen("INSERT INTO", "INSERT IGNORE INTO", 1);
            stmt
        }
        _ => session_first_seen::Entity::insert(model)
            .on_conflict(
                OnConflict::column(session_first_seen::Column::SessionId)
                    .do_nothing()
                    .to_owned(),
            )
            .build(backend),
    }
}

impl SeaOrmStorage {
    /// 原子地记录 session 首次出现
    ///
    /// 单条"插入，冲突则忽略"语句，直接在连接池上执行
    /// （不在外层事务内），语句结束即提交。并发调用同一 session_id 时由主键约束
    /// 决定唯一的胜者。该方法不返回 Err：故障以 `StorageFault` 表示。
    pub async fn insert_first_seen(
        &self,
        session_id: &str,
        action: ActionType,
        context: FirstSeenContext,
    ) -> FirstSeenInsert {
        let now = Utc::now();
        let model = session_first_seen::ActiveModel {
            session_id: Set(session_id.to_string()),
            first_action_type: Set(action.as_ref().to_string()),
            first_branch_id: Set(context.branch_id),
            first_qr_code_id: Set(context.qr_code_id),
            first_seen_at: Set(now),
            created_at: Set(now),
        };

        let stmt = first_seen_insert_statement(self.db.get_database_backend(), model);

        match self.db.execute_raw(stmt).await {
            Ok(res) if res.rows_affected() == 0 => FirstSeenInsert::AlreadyExists,
            Ok(_) => FirstSeenInsert::Inserted,
            Err(e) if is_conflict_error(&e) => FirstSeenInsert::AlreadyExists,
            Err(e) => FirstSeenInsert::StorageFault(e.to_string()),
        }
    }

    /// 查询 session 首次出现记录
    pub async fn get_first_seen(&self, session_id: &str) -> Result<Option<SessionFirstSeen>> {
        let model = session_first_seen::Entity::find_by_id(session_id.to_string())
            .one(&self.db)
            .await?;

        Ok(model.map(|m| SessionFirstSeen {
            session_id: m.session_id,
            first_action_type: m.first_action_type,
            first_branch_id: m.first_branch_id,
            first_qr_code_id: m.first_qr_code_id,
            first_seen_at: m.first_seen_at,
            created_at: m.created_at,
        }))
    }

    /// 删除 created_at 早于 cutoff 的首次出现记录，返回删除数量
    pub async fn purge_first_seen_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = session_first_seen::Entity::delete_many()
            .filter(session_first_seen::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
