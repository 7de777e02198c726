// ==========================================
// 生产执行系统 - 扣减事件数据仓储
// ==========================================
// 追加写入: 只有 insert 与查询，没有 update / delete
// ==========================================

use crate::domain::material::DeductionEvent;
use crate::repository::codec::{format_ts, parse_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const EVENT_COLUMNS: &str =
    "event_id, task_id, cycle, order_id, stage_name, material_id, amount, deducted_at";

pub struct DeductionEventRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeductionEventRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> SqliteResult<DeductionEvent> {
        Ok(DeductionEvent {
            event_id: row.get(0)?,
            task_id: row.get(1)?,
            cycle: row.get(2)?,
            order_id: row.get(3)?,
            stage_name: row.get(4)?,
            material_id: row.get(5)?,
            amount: row.get(6)?,
            deducted_at: parse_ts(7, &row.get::<_, String>(7)?)?,
        })
    }

    /// 写入扣减事件（与库存扣减同一事务）
    pub fn insert_tx(conn: &Connection, event: &DeductionEvent) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO deduction_events (
                event_id, task_id, cycle, order_id, stage_name, material_id, amount, deducted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                event.event_id,
                event.task_id,
                event.cycle,
                event.order_id,
                event.stage_name,
                event.material_id,
                event.amount,
                format_ts(&event.deducted_at),
            ],
        )?;
        Ok(())
    }

    /// 查询任务某一周期的扣减事件（物料ID升序）
    pub fn list_by_task_cycle_tx(
        conn: &Connection,
        task_id: i64,
        cycle: i64,
    ) -> RepositoryResult<Vec<DeductionEvent>> {
        let sql = format!(
            "SELECT {} FROM deduction_events WHERE task_id = ?1 AND cycle = ?2 ORDER BY material_id",
            EVENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let events = stmt
            .query_map(params![task_id, cycle], Self::map_row)?
            .collect::<SqliteResult<Vec<DeductionEvent>>>()?;
        Ok(events)
    }

    /// 查询任务全部周期的扣减事件
    pub fn list_by_task(&self, task_id: i64) -> RepositoryResult<Vec<DeductionEvent>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM deduction_events WHERE task_id = ?1 ORDER BY cycle, material_id",
            EVENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let events = stmt
            .query_map(params![task_id], Self::map_row)?
            .collect::<SqliteResult<Vec<DeductionEvent>>>()?;
        Ok(events)
    }
}
