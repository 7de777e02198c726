// ==========================================
// 生产执行系统 - 生产订单与工序任务数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: production_orders / production_tasks
// ==========================================

use crate::domain::order::{NewOrder, ProductionOrder, ProductionTask};
use crate::domain::types::{OrderStatus, TaskStatus};
use crate::repository::codec::{format_opt_ts, format_ts, parse_enum, parse_opt_ts, parse_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ORDER_COLUMNS: &str =
    "id, client_name, product_id, quantity, start_date, deadline_date, status";
const TASK_COLUMNS: &str = "id, order_id, seq_no, stage_name, status, responsible_principal_id, \
     start_time_actual, end_time_actual, cycle";

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_order(row: &Row) -> SqliteResult<ProductionOrder> {
        Ok(ProductionOrder {
            id: row.get(0)?,
            client_name: row.get(1)?,
            product_id: row.get(2)?,
            quantity: row.get(3)?,
            start_date: parse_ts(4, &row.get::<_, String>(4)?)?,
            deadline_date: parse_ts(5, &row.get::<_, String>(5)?)?,
            status: parse_enum(6, &row.get::<_, String>(6)?)?,
        })
    }

    fn map_task(row: &Row) -> SqliteResult<ProductionTask> {
        Ok(ProductionTask {
            id: row.get(0)?,
            order_id: row.get(1)?,
            seq_no: row.get(2)?,
            stage_name: row.get(3)?,
            status: parse_enum::<TaskStatus>(4, &row.get::<_, String>(4)?)?,
            responsible_principal_id: row.get(5)?,
            start_time_actual: parse_opt_ts(6, row.get(6)?)?,
            end_time_actual: parse_opt_ts(7, row.get(7)?)?,
            cycle: row.get(8)?,
        })
    }

    // ==========================================
    // 订单
    // ==========================================

    /// 插入订单（状态固定为 NEW）
    pub fn insert_order_tx(conn: &Connection, order: &NewOrder) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO production_orders (
                client_name, product_id, quantity, start_date, deadline_date, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                order.client_name,
                order.product_id,
                order.quantity,
                format_ts(&order.start_date),
                format_ts(&order.deadline_date),
                OrderStatus::New.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_order_by_id(&self, order_id: i64) -> RepositoryResult<Option<ProductionOrder>> {
        let conn = self.get_conn()?;
        Self::find_order_by_id_tx(&conn, order_id)
    }

    pub fn find_order_by_id_tx(
        conn: &Connection,
        order_id: i64,
    ) -> RepositoryResult<Option<ProductionOrder>> {
        let sql = format!("SELECT {} FROM production_orders WHERE id = ?1", ORDER_COLUMNS);
        let order = conn
            .query_row(&sql, params![order_id], Self::map_order)
            .optional()?;
        Ok(order)
    }

    /// 查询全部订单（ID升序）
    pub fn list_orders(&self) -> RepositoryResult<Vec<ProductionOrder>> {
        let conn = self.get_conn()?;
        Self::list_orders_tx(&conn)
    }

    pub fn list_orders_tx(conn: &Connection) -> RepositoryResult<Vec<ProductionOrder>> {
        let sql = format!("SELECT {} FROM production_orders ORDER BY id", ORDER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map([], Self::map_order)?
            .collect::<SqliteResult<Vec<ProductionOrder>>>()?;
        Ok(orders)
    }

    pub fn update_order_status_tx(
        conn: &Connection,
        order_id: i64,
        status: OrderStatus,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE production_orders SET status = ?1 WHERE id = ?2",
            params![status.as_str(), order_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("ProductionOrder", order_id));
        }
        Ok(())
    }

    // ==========================================
    // 工序任务
    // ==========================================

    /// 插入待开工任务
    pub fn insert_task_tx(
        conn: &Connection,
        order_id: i64,
        seq_no: i64,
        stage_name: &str,
    ) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO production_tasks (order_id, seq_no, stage_name, status, cycle)
            VALUES (?1, ?2, ?3, ?4, 1)
            "#,
            params![order_id, seq_no, stage_name, TaskStatus::Pending.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_task_by_id(&self, task_id: i64) -> RepositoryResult<Option<ProductionTask>> {
        let conn = self.get_conn()?;
        Self::find_task_by_id_tx(&conn, task_id)
    }

    pub fn find_task_by_id_tx(
        conn: &Connection,
        task_id: i64,
    ) -> RepositoryResult<Option<ProductionTask>> {
        let sql = format!("SELECT {} FROM production_tasks WHERE id = ?1", TASK_COLUMNS);
        let task = conn
            .query_row(&sql, params![task_id], Self::map_task)
            .optional()?;
        Ok(task)
    }

    /// 查询订单下的任务（工序序号升序）
    pub fn list_tasks_by_order(&self, order_id: i64) -> RepositoryResult<Vec<ProductionTask>> {
        let conn = self.get_conn()?;
        Self::list_tasks_by_order_tx(&conn, order_id)
    }

    pub fn list_tasks_by_order_tx(
        conn: &Connection,
        order_id: i64,
    ) -> RepositoryResult<Vec<ProductionTask>> {
        let sql = format!(
            "SELECT {} FROM production_tasks WHERE order_id = ?1 ORDER BY seq_no",
            TASK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![order_id], Self::map_task)?
            .collect::<SqliteResult<Vec<ProductionTask>>>()?;
        Ok(tasks)
    }

    /// 查询全部任务（订单ID、工序序号升序）
    pub fn list_all_tasks(&self) -> RepositoryResult<Vec<ProductionTask>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_tasks ORDER BY order_id, seq_no",
            TASK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], Self::map_task)?
            .collect::<SqliteResult<Vec<ProductionTask>>>()?;
        Ok(tasks)
    }

    /// 查询指定状态的任务
    pub fn list_tasks_by_status_tx(
        conn: &Connection,
        status: TaskStatus,
    ) -> RepositoryResult<Vec<ProductionTask>> {
        let sql = format!(
            "SELECT {} FROM production_tasks WHERE status = ?1 ORDER BY order_id, seq_no",
            TASK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![status.as_str()], Self::map_task)?
            .collect::<SqliteResult<Vec<ProductionTask>>>()?;
        Ok(tasks)
    }

    /// 回写任务的可变字段
    pub fn update_task_tx(conn: &Connection, task: &ProductionTask) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE production_tasks
            SET status = ?1,
                responsible_principal_id = ?2,
                start_time_actual = ?3,
                end_time_actual = ?4,
                cycle = ?5
            WHERE id = ?6
            "#,
            params![
                task.status.as_str(),
                task.responsible_principal_id,
                format_opt_ts(&task.start_time_actual),
                format_opt_ts(&task.end_time_actual),
                task.cycle,
                task.id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("ProductionTask", task.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::NewProduct;
    use crate::repository::product_repo::ProductRepository;
    use chrono::NaiveDate;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_order_and_task_round_trip() {
        let conn = setup();
        let product_id = ProductRepository::new(conn.clone())
            .insert_product(&NewProduct {
                name: "泵壳".to_string(),
                code: "HOUSING-01".to_string(),
                description: None,
            })
            .unwrap();
        let repo = OrderRepository::new(conn.clone());

        let start = NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let (order_id, task_id) = {
            let guard = conn.lock().unwrap();
            let order_id = OrderRepository::insert_order_tx(
                &guard,
                &NewOrder {
                    client_name: "客户A".to_string(),
                    product_id,
                    quantity: 3,
                    start_date: start,
                    deadline_date: start + chrono::Duration::days(7),
                },
            )
            .unwrap();
            let task_id = OrderRepository::insert_task_tx(&guard, order_id, 1, "铸造").unwrap();
            (order_id, task_id)
        };

        let order = repo.find_order_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.start_date, start);

        let mut task = repo.find_task_by_id(task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.cycle, 1);
        assert!(task.start_time_actual.is_none());

        task.status = TaskStatus::Working;
        task.start_time_actual = Some(start);
        {
            let guard = conn.lock().unwrap();
            OrderRepository::update_task_tx(&guard, &task).unwrap();
        }
        let reloaded = repo.find_task_by_id(task_id).unwrap().unwrap();
        assert_eq!(reloaded, task);
    }

    #[test]
    fn test_corrupt_status_fails_fast() {
        let conn = setup();
        let repo = OrderRepository::new(conn.clone());
        {
            let guard = conn.lock().unwrap();
            guard
                .execute_batch(
                    r#"
                    INSERT INTO products (name, code) VALUES ('P', 'P-1');
                    INSERT INTO production_orders (client_name, product_id, quantity, start_date, deadline_date, status)
                    VALUES ('C', 1, 1, '2026-01-01 00:00:00', '2026-01-02 00:00:00', 'ARCHIVED');
                    "#,
                )
                .unwrap();
        }

        let err = repo.find_order_by_id(1).unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }
}
