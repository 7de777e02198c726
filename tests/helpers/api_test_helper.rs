// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#![allow(dead_code)]

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::ops::Deref;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use tempfile::NamedTempFile;

use production_mes::api::{CreateOrderRequest, OrderWithTasks};
use production_mes::app::AppState;
use production_mes::domain::{
    MaterialRequirement, NewMaterial, NewPrincipal, NewProduct, NewStageTemplate, Principal,
    PrincipalRole,
};

pub const TEST_ACTOR: &str = "test_dispatcher";

/// 工序定义: (名称, 单件工时, [(物料ID, 单件定额)])
pub type StageSpec<'a> = (&'a str, i64, &'a [(i64, f64)]);

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 基于临时数据库文件装配完整的 AppState
pub struct ApiTestEnv {
    pub state: AppState,
    pub db_path: String,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl Deref for ApiTestEnv {
    type Target = AppState;

    fn deref(&self) -> &AppState {
        &self.state
    }
}

impl ApiTestEnv {
    /// 创建新的API测试环境
    pub fn new() -> Result<Self, String> {
        production_mes::logging::init_test();

        let (temp_file, db_path) =
            test_helpers::create_test_db().map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let state = AppState::new(db_path.clone())?;

        Ok(Self {
            state,
            db_path,
            _temp_file: temp_file,
        })
    }

    /// 独立连接，用于绕过API直接修改或核对数据
    pub fn raw_conn(&self) -> Connection {
        production_mes::db::open_sqlite_connection(&self.db_path).expect("无法打开测试数据库")
    }

    // ==========================================
    // 数据准备
    // ==========================================

    pub fn seed_principal(&self, username: &str, role: PrincipalRole) -> Principal {
        self.catalog_api
            .create_principal(
                NewPrincipal {
                    username: username.to_string(),
                    last_name: "测试".to_string(),
                    first_name: username.to_string(),
                    patronymic: None,
                    role,
                },
                TEST_ACTOR,
            )
            .expect("创建人员失败")
    }

    pub fn seed_operator(&self) -> Principal {
        self.seed_principal("operator_a", PrincipalRole::Operator)
    }

    pub fn seed_material(&self, name: &str, unit: &str, stock: f64) -> i64 {
        self.catalog_api
            .create_material(
                NewMaterial {
                    name: name.to_string(),
                    unit: unit.to_string(),
                    quantity_in_stock: stock,
                },
                TEST_ACTOR,
            )
            .expect("创建物料失败")
            .id
    }

    /// 创建产品及其工艺卡（位置按切片顺序从 1 开始）
    pub fn seed_product(&self, code: &str, stages: &[StageSpec<'_>]) -> i64 {
        let product = self
            .catalog_api
            .create_product(
                NewProduct {
                    name: format!("产品 {}", code),
                    code: code.to_string(),
                    description: None,
                },
                TEST_ACTOR,
            )
            .expect("创建产品失败");

        for (idx, (name, norm, reqs)) in stages.iter().enumerate() {
            self.catalog_api
                .create_stage(
                    NewStageTemplate {
                        product_id: product.id,
                        name: name.to_string(),
                        order_in_chain: idx as i64 + 1,
                        norm_time_minutes: *norm,
                        requirements: reqs
                            .iter()
                            .map(|(material_id, qty)| MaterialRequirement {
                                material_id: *material_id,
                                quantity_needed: *qty,
                            })
                            .collect(),
                    },
                    TEST_ACTOR,
                )
                .expect("创建工序失败");
        }
        product.id
    }

    pub fn create_order(&self, product_id: i64, quantity: i64) -> OrderWithTasks {
        let start = base_time();
        self.order_api
            .create_order(
                CreateOrderRequest {
                    client_name: "测试客户".to_string(),
                    product_id,
                    quantity,
                    deadline_date: start + Duration::days(7),
                    start_date: Some(start),
                },
                TEST_ACTOR,
            )
            .expect("创建订单失败")
    }

    pub fn stock_of(&self, material_id: i64) -> f64 {
        self.catalog_api
            .list_materials()
            .expect("查询物料失败")
            .into_iter()
            .find(|m| m.id == material_id)
            .map(|m| m.quantity_in_stock)
            .expect("物料不存在")
    }
}

/// 固定开工时间，保证投影结果可比较
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .expect("无效日期")
}
