// ==========================================
// 生产执行系统 - 主数据 API
// ==========================================
// 职责: 物料、产品、工艺卡、人员的维护与查询
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::material::{Material, NewMaterial};
use crate::domain::principal::{NewPrincipal, Principal};
use crate::domain::product::{NewProduct, NewStageTemplate, Product, StageTemplate};
use crate::engine::template_resolver::TemplateResolver;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::material_repo::MaterialRepository;
use crate::repository::principal_repo::PrincipalRepository;
use crate::repository::product_repo::ProductRepository;

pub struct CatalogApi {
    material_repo: Arc<MaterialRepository>,
    product_repo: Arc<ProductRepository>,
    principal_repo: Arc<PrincipalRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    resolver: Arc<TemplateResolver>,
}

fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{} 不能为空", field)));
    }
    Ok(())
}

impl CatalogApi {
    pub fn new(
        material_repo: Arc<MaterialRepository>,
        product_repo: Arc<ProductRepository>,
        principal_repo: Arc<PrincipalRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        resolver: Arc<TemplateResolver>,
    ) -> Self {
        Self {
            material_repo,
            product_repo,
            principal_repo,
            action_log_repo,
            resolver,
        }
    }

    fn audit(&self, log: ActionLog) -> ApiResult<()> {
        self.action_log_repo.insert(&log)?;
        Ok(())
    }

    // ==========================================
    // 物料
    // ==========================================

    pub fn create_material(&self, material: NewMaterial, actor: &str) -> ApiResult<Material> {
        require_non_empty("物料名称", &material.name)?;
        require_non_empty("计量单位", &material.unit)?;
        if !material.quantity_in_stock.is_finite() || material.quantity_in_stock < 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "初始库存不能为负: {}",
                material.quantity_in_stock
            )));
        }

        let id = self.material_repo.insert(&material)?;
        self.audit(
            ActionLog::new(ActionType::CreateMaterial, actor, Utc::now().naive_utc()).with_payload(
                json!({ "material_id": id, "name": material.name, "stock": material.quantity_in_stock }),
            ),
        )?;
        info!(material_id = id, "物料已创建");

        self.material_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::InternalError(format!("物料{}写入后读取失败", id)))
    }

    pub fn list_materials(&self) -> ApiResult<Vec<Material>> {
        Ok(self.material_repo.list_all()?)
    }

    // ==========================================
    // 产品与工艺卡
    // ==========================================

    pub fn create_product(&self, product: NewProduct, actor: &str) -> ApiResult<Product> {
        require_non_empty("产品名称", &product.name)?;
        require_non_empty("产品编码", &product.code)?;

        let id = self.product_repo.insert_product(&product)?;
        self.audit(
            ActionLog::new(ActionType::CreateProduct, actor, Utc::now().naive_utc())
                .with_payload(json!({ "product_id": id, "code": product.code })),
        )?;
        info!(product_id = id, code = %product.code, "产品已创建");

        self.product_repo
            .find_product_by_id(id)?
            .ok_or_else(|| ApiError::InternalError(format!("产品{}写入后读取失败", id)))
    }

    pub fn list_products(&self) -> ApiResult<Vec<Product>> {
        Ok(self.product_repo.list_products()?)
    }

    /// 新增工序模板（含物料定额）
    ///
    /// 同一产品内名称或位置重复时由唯一约束拒绝。
    pub fn create_stage(&self, stage: NewStageTemplate, actor: &str) -> ApiResult<StageTemplate> {
        require_non_empty("工序名称", &stage.name)?;
        if stage.order_in_chain <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "工序位置必须为正整数: {}",
                stage.order_in_chain
            )));
        }
        if stage.norm_time_minutes <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "工时定额必须为正整数: {}",
                stage.norm_time_minutes
            )));
        }
        for req in &stage.requirements {
            if !req.quantity_needed.is_finite() || req.quantity_needed <= 0.0 {
                return Err(ApiError::InvalidInput(format!(
                    "物料定额必须为正数: material_id={}, quantity={}",
                    req.material_id, req.quantity_needed
                )));
            }
            if self.material_repo.find_by_id(req.material_id)?.is_none() {
                return Err(ApiError::NotFound(format!("物料(id={})不存在", req.material_id)));
            }
        }
        if self.product_repo.find_product_by_id(stage.product_id)?.is_none() {
            return Err(ApiError::NotFound(format!("产品(id={})不存在", stage.product_id)));
        }

        let stage_id = self.product_repo.insert_stage(&stage)?;
        self.audit(
            ActionLog::new(ActionType::CreateStage, actor, Utc::now().naive_utc()).with_payload(json!({
                "stage_id": stage_id,
                "product_id": stage.product_id,
                "name": stage.name,
                "order_in_chain": stage.order_in_chain,
            })),
        )?;

        self.resolver
            .resolve_chain(stage.product_id)?
            .into_iter()
            .find(|s| s.id == stage_id)
            .ok_or_else(|| ApiError::InternalError(format!("工序{}写入后读取失败", stage_id)))
    }

    /// 产品工艺卡（有序）
    pub fn resolve_chain(&self, product_id: i64) -> ApiResult<Vec<StageTemplate>> {
        Ok(self.resolver.resolve_chain(product_id)?)
    }

    // ==========================================
    // 人员
    // ==========================================

    pub fn create_principal(&self, principal: NewPrincipal, actor: &str) -> ApiResult<Principal> {
        require_non_empty("用户名", &principal.username)?;

        let id = self.principal_repo.insert(&principal)?;
        self.audit(
            ActionLog::new(ActionType::CreatePrincipal, actor, Utc::now().naive_utc()).with_payload(
                json!({ "principal_id": id, "username": principal.username, "role": principal.role.as_str() }),
            ),
        )?;

        self.principal_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::InternalError(format!("人员{}写入后读取失败", id)))
    }

    pub fn list_principals(&self) -> ApiResult<Vec<Principal>> {
        Ok(self.principal_repo.list_all()?)
    }

    pub fn find_principal_by_username(&self, username: &str) -> ApiResult<Principal> {
        self.principal_repo
            .find_by_username(username)?
            .ok_or_else(|| ApiError::NotFound(format!("人员(username={})不存在", username)))
    }

    pub fn deactivate_principal(&self, principal_id: i64, actor: &str) -> ApiResult<()> {
        self.principal_repo.deactivate(principal_id)?;
        self.audit(
            ActionLog::new(ActionType::DeactivatePrincipal, actor, Utc::now().naive_utc())
                .with_payload(json!({ "principal_id": principal_id, "is_active": false }))
                .with_detail("人员停用"),
        )?;
        Ok(())
    }
}
