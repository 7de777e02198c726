// ==========================================
// 生产执行系统 - 操作日志数据仓储
// ==========================================
// 红线: 所有写入必须记录
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::codec::{format_ts, parse_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const LOG_COLUMNS: &str =
    "action_id, action_type, action_ts, actor, order_id, task_id, payload_json, detail";

pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> SqliteResult<ActionLog> {
        let payload_raw: Option<String> = row.get(6)?;
        Ok(ActionLog {
            action_id: row.get(0)?,
            action_type: row.get(1)?,
            action_ts: parse_ts(2, &row.get::<_, String>(2)?)?,
            actor: row.get(3)?,
            order_id: row.get(4)?,
            task_id: row.get(5)?,
            payload_json: payload_raw.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(7)?,
        })
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, log)
    }

    pub fn insert_tx(conn: &Connection, log: &ActionLog) -> RepositoryResult<String> {
        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, action_type, action_ts, actor, order_id, task_id, payload_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                log.action_id,
                log.action_type,
                format_ts(&log.action_ts),
                log.actor,
                log.order_id,
                log.task_id,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;
        Ok(log.action_id.clone())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按任务查询日志（时间升序）
    pub fn find_by_task(&self, task_id: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE task_id = ?1 ORDER BY action_ts, rowid",
            LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![task_id], Self::map_row)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(logs)
    }

    /// 按操作类型查询日志（时间升序）
    pub fn find_by_type(&self, action_type: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE action_type = ?1 ORDER BY action_ts, rowid",
            LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![action_type], Self::map_row)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(logs)
    }

    /// 最近的日志（时间倒序）
    pub fn find_recent(&self, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, rowid DESC LIMIT ?1",
            LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(logs)
    }
}
