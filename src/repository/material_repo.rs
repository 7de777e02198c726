// ==========================================
// 生产执行系统 - 物料数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 库存扣减为单条条件 UPDATE，检查与扣减在同一语句内完成
// ==========================================

use crate::domain::material::{Material, NewMaterial, STOCK_EPSILON};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 条件扣减的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalDeduct {
    /// 已扣减，返回扣减后结存
    Deducted { remaining: f64 },
    /// 库存不足，未做任何修改
    Insufficient { available: f64 },
    /// 物料不存在
    Missing,
}

// ==========================================
// MaterialRepository - 物料仓储
// ==========================================
pub struct MaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> SqliteResult<Material> {
        Ok(Material {
            id: row.get(0)?,
            name: row.get(1)?,
            unit: row.get(2)?,
            quantity_in_stock: row.get(3)?,
        })
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 新建物料
    ///
    /// # 返回
    /// - Ok(id): 新物料ID
    /// - Err: 库存为负时触发 CHECK 约束
    pub fn insert(&self, material: &NewMaterial) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, material)
    }

    pub fn insert_tx(conn: &Connection, material: &NewMaterial) -> RepositoryResult<i64> {
        conn.execute(
            "INSERT INTO materials (name, unit, quantity_in_stock) VALUES (?1, ?2, ?3)",
            params![material.name, material.unit, material.quantity_in_stock],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 条件扣减库存
    ///
    /// # 参数
    /// - material_id: 物料ID
    /// - amount: 扣减量（调用方保证 > 0）
    ///
    /// # 说明
    /// 仅当结存 >= amount（容差 STOCK_EPSILON）时扣减，结果截断到 0；未命中时再读一次结存区分“不足”与“不存在”
    pub fn deduct_if_sufficient_tx(
        conn: &Connection,
        material_id: i64,
        amount: f64,
    ) -> RepositoryResult<ConditionalDeduct> {
        let affected = conn.execute(
            r#"
            UPDATE materials
            SET quantity_in_stock = MAX(quantity_in_stock - ?1, 0.0)
            WHERE id = ?2 AND quantity_in_stock + ?3 >= ?1
            "#,
            params![amount, material_id, STOCK_EPSILON],
        )?;

        let current: Option<f64> = conn
            .query_row(
                "SELECT quantity_in_stock FROM materials WHERE id = ?1",
                params![material_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match (affected, current) {
            (0, None) => ConditionalDeduct::Missing,
            (0, Some(available)) => ConditionalDeduct::Insufficient { available },
            (_, Some(remaining)) => ConditionalDeduct::Deducted { remaining },
            (_, None) => {
                return Err(RepositoryError::InternalError(format!(
                    "物料{}扣减后读取失败",
                    material_id
                )))
            }
        })
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, material_id: i64) -> RepositoryResult<Option<Material>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, material_id)
    }

    pub fn find_by_id_tx(conn: &Connection, material_id: i64) -> RepositoryResult<Option<Material>> {
        let material = conn
            .query_row(
                "SELECT id, name, unit, quantity_in_stock FROM materials WHERE id = ?1",
                params![material_id],
                Self::map_row,
            )
            .optional()?;
        Ok(material)
    }

    /// 查询全部物料（按ID升序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Material>> {
        let conn = self.get_conn()?;
        Self::list_all_tx(&conn)
    }

    pub fn list_all_tx(conn: &Connection) -> RepositoryResult<Vec<Material>> {
        let mut stmt =
            conn.prepare("SELECT id, name, unit, quantity_in_stock FROM materials ORDER BY id")?;
        let materials = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<Material>>>()?;
        Ok(materials)
    }
}
