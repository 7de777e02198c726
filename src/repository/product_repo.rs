// ==========================================
// 生产执行系统 - 产品与工艺卡数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: products / stage_templates / stage_material_requirements
// ==========================================

use crate::domain::material::MaterialRequirement;
use crate::domain::product::{NewProduct, NewStageTemplate, Product, StageTemplate};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const STAGE_COLUMNS: &str = "id, product_id, name, order_in_chain, norm_time_minutes";

// ==========================================
// ProductRepository - 产品仓储
// ==========================================
pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_product(row: &Row) -> SqliteResult<Product> {
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            code: row.get(2)?,
            description: row.get(3)?,
        })
    }

    /// 映射工序行（requirements 由调用方另行加载）
    fn map_stage(row: &Row) -> SqliteResult<StageTemplate> {
        Ok(StageTemplate {
            id: row.get(0)?,
            product_id: row.get(1)?,
            name: row.get(2)?,
            order_in_chain: row.get(3)?,
            norm_time_minutes: row.get(4)?,
            requirements: Vec::new(),
        })
    }

    // ==========================================
    // 产品
    // ==========================================

    pub fn insert_product(&self, product: &NewProduct) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::insert_product_tx(&conn, product)
    }

    pub fn insert_product_tx(conn: &Connection, product: &NewProduct) -> RepositoryResult<i64> {
        conn.execute(
            "INSERT INTO products (name, code, description) VALUES (?1, ?2, ?3)",
            params![product.name, product.code, product.description],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_product_by_id(&self, product_id: i64) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        Self::find_product_by_id_tx(&conn, product_id)
    }

    pub fn find_product_by_id_tx(
        conn: &Connection,
        product_id: i64,
    ) -> RepositoryResult<Option<Product>> {
        let product = conn
            .query_row(
                "SELECT id, name, code, description FROM products WHERE id = ?1",
                params![product_id],
                Self::map_product,
            )
            .optional()?;
        Ok(product)
    }

    pub fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, name, code, description FROM products ORDER BY id")?;
        let products = stmt
            .query_map([], Self::map_product)?
            .collect::<SqliteResult<Vec<Product>>>()?;
        Ok(products)
    }

    // ==========================================
    // 工序模板
    // ==========================================

    /// 新建工序模板及其物料定额（事务化）
    pub fn insert_stage(&self, stage: &NewStageTemplate) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let stage_id = Self::insert_stage_tx(&tx, stage)?;
        tx.commit()?;
        Ok(stage_id)
    }

    pub fn insert_stage_tx(conn: &Connection, stage: &NewStageTemplate) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO stage_templates (product_id, name, order_in_chain, norm_time_minutes)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                stage.product_id,
                stage.name,
                stage.order_in_chain,
                stage.norm_time_minutes
            ],
        )?;
        let stage_id = conn.last_insert_rowid();

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO stage_material_requirements (stage_template_id, material_id, quantity_needed)
            VALUES (?1, ?2, ?3)
            "#,
        )?;
        for req in &stage.requirements {
            stmt.execute(params![stage_id, req.material_id, req.quantity_needed])?;
        }

        Ok(stage_id)
    }

    /// 按产品查询工序链（order_in_chain 升序，ID 为次序键），含物料定额
    pub fn list_stages_by_product_tx(
        conn: &Connection,
        product_id: i64,
    ) -> RepositoryResult<Vec<StageTemplate>> {
        let sql = format!(
            "SELECT {} FROM stage_templates WHERE product_id = ?1 ORDER BY order_in_chain, id",
            STAGE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut stages = stmt
            .query_map(params![product_id], Self::map_stage)?
            .collect::<SqliteResult<Vec<StageTemplate>>>()?;

        for stage in stages.iter_mut() {
            stage.requirements = Self::requirements_for_stage_tx(conn, stage.id)?;
        }
        Ok(stages)
    }

    pub fn find_stage_by_id_tx(
        conn: &Connection,
        stage_id: i64,
    ) -> RepositoryResult<Option<StageTemplate>> {
        let sql = format!("SELECT {} FROM stage_templates WHERE id = ?1", STAGE_COLUMNS);
        let stage = conn
            .query_row(&sql, params![stage_id], Self::map_stage)
            .optional()?;

        match stage {
            Some(mut stage) => {
                stage.requirements = Self::requirements_for_stage_tx(conn, stage.id)?;
                Ok(Some(stage))
            }
            None => Ok(None),
        }
    }

    /// 按产品 + 工序名称查找模板
    pub fn find_stage_by_name_tx(
        conn: &Connection,
        product_id: i64,
        stage_name: &str,
    ) -> RepositoryResult<Option<StageTemplate>> {
        let sql = format!(
            "SELECT {} FROM stage_templates WHERE product_id = ?1 AND name = ?2",
            STAGE_COLUMNS
        );
        let stage = conn
            .query_row(&sql, params![product_id, stage_name], Self::map_stage)
            .optional()?;

        match stage {
            Some(mut stage) => {
                stage.requirements = Self::requirements_for_stage_tx(conn, stage.id)?;
                Ok(Some(stage))
            }
            None => Ok(None),
        }
    }

    /// 查询工序的物料定额（物料ID升序）
    pub fn requirements_for_stage_tx(
        conn: &Connection,
        stage_id: i64,
    ) -> RepositoryResult<Vec<MaterialRequirement>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT material_id, quantity_needed
            FROM stage_material_requirements
            WHERE stage_template_id = ?1
            ORDER BY material_id, id
            "#,
        )?;
        let reqs = stmt
            .query_map(params![stage_id], |row| {
                Ok(MaterialRequirement {
                    material_id: row.get(0)?,
                    quantity_needed: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<MaterialRequirement>>>()?;
        Ok(reqs)
    }

    /// 获取连接（供模板解析器在单次加锁内读取多张表）
    ///
    /// 错误类型由调用方决定，只需能承接加锁失败
    pub(crate) fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepositoryError>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::material::NewMaterial;
    use crate::repository::material_repo::MaterialRepository;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn new_stage(product_id: i64, name: &str, order: i64) -> NewStageTemplate {
        NewStageTemplate {
            product_id,
            name: name.to_string(),
            order_in_chain: order,
            norm_time_minutes: 30,
            requirements: vec![],
        }
    }

    #[test]
    fn test_stage_chain_sorted_by_order_in_chain() {
        let conn = setup();
        let repo = ProductRepository::new(conn.clone());
        let product_id = repo
            .insert_product(&NewProduct {
                name: "离心泵".to_string(),
                code: "PUMP-01".to_string(),
                description: None,
            })
            .unwrap();

        repo.insert_stage(&new_stage(product_id, "喷漆", 3)).unwrap();
        repo.insert_stage(&new_stage(product_id, "下料", 1)).unwrap();
        repo.insert_stage(&new_stage(product_id, "焊接", 2)).unwrap();

        let guard = conn.lock().unwrap();
        let names: Vec<String> = ProductRepository::list_stages_by_product_tx(&guard, product_id)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["下料", "焊接", "喷漆"]);
    }

    #[test]
    fn test_duplicate_order_in_chain_rejected() {
        let repo = ProductRepository::new(setup());
        let product_id = repo
            .insert_product(&NewProduct {
                name: "阀门".to_string(),
                code: "VALVE-01".to_string(),
                description: None,
            })
            .unwrap();

        repo.insert_stage(&new_stage(product_id, "铸造", 1)).unwrap();
        let err = repo.insert_stage(&new_stage(product_id, "机加工", 1)).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_requirements_loaded_with_stage() {
        let conn = setup();
        let materials = MaterialRepository::new(conn.clone());
        let products = ProductRepository::new(conn.clone());

        let m1 = materials
            .insert(&NewMaterial {
                name: "油漆".to_string(),
                unit: "L".to_string(),
                quantity_in_stock: 10.0,
            })
            .unwrap();
        let product_id = products
            .insert_product(&NewProduct {
                name: "机架".to_string(),
                code: "FRAME-01".to_string(),
                description: Some("焊接机架".to_string()),
            })
            .unwrap();

        let mut stage = new_stage(product_id, "喷漆", 1);
        stage.requirements.push(MaterialRequirement {
            material_id: m1,
            quantity_needed: 0.5,
        });
        let stage_id = products.insert_stage(&stage).unwrap();

        let guard = conn.lock().unwrap();
        let found = ProductRepository::find_stage_by_name_tx(&guard, product_id, "喷漆")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, stage_id);
        assert_eq!(found.requirements.len(), 1);
        assert_eq!(found.requirements[0].quantity_needed, 0.5);
        assert!(ProductRepository::find_stage_by_name_tx(&guard, product_id, "焊接")
            .unwrap()
            .is_none());
    }
}
