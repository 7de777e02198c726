// ==========================================
// 生产执行系统 - 工艺卡解析器
// ==========================================
// 职责: 产品 → 有序工序模板链（含物料定额）
// 排序: order_in_chain 升序，工序ID为次序键
// ==========================================

use crate::domain::material::MaterialRequirement;
use crate::domain::product::StageTemplate;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::product_repo::ProductRepository;
use rusqlite::Connection;
use std::sync::Arc;

pub struct TemplateResolver {
    product_repo: Arc<ProductRepository>,
}

impl TemplateResolver {
    pub fn new(product_repo: Arc<ProductRepository>) -> Self {
        Self { product_repo }
    }

    pub fn resolve_chain(&self, product_id: i64) -> EngineResult<Vec<StageTemplate>> {
        self.product_repo
            .with_conn(|conn| Self::resolve_chain_tx(conn, product_id))
    }

    /// 事务内解析工艺卡
    pub fn resolve_chain_tx(conn: &Connection, product_id: i64) -> EngineResult<Vec<StageTemplate>> {
        if ProductRepository::find_product_by_id_tx(conn, product_id)?.is_none() {
            return Err(EngineError::ProductNotFound(product_id));
        }
        Ok(ProductRepository::list_stages_by_product_tx(conn, product_id)?)
    }

    pub fn requirements_for(&self, stage_template_id: i64) -> EngineResult<Vec<MaterialRequirement>> {
        self.product_repo.with_conn(|conn| {
            ProductRepository::find_stage_by_id_tx(conn, stage_template_id)?
                .map(|stage| stage.requirements)
                .ok_or(EngineError::StageTemplateNotFound(stage_template_id))
        })
    }

    pub fn find_stage_by_name(
        &self,
        product_id: i64,
        stage_name: &str,
    ) -> EngineResult<Option<StageTemplate>> {
        self.product_repo.with_conn(|conn| {
            Ok(ProductRepository::find_stage_by_name_tx(conn, product_id, stage_name)?)
        })
    }
}
