// ==========================================
// 生产执行系统 - 物料领域模型
// ==========================================
// 红线: quantity_in_stock 只允许由库存台账扣减，且永不为负
// ==========================================

use serde::{Deserialize, Serialize};

/// 库存比较容差（结存与需求量均为浮点累计值）
pub const STOCK_EPSILON: f64 = 1e-9;

/// 结存是否覆盖需求量（容差内视为相等）
pub fn stock_covers(available: f64, required: f64) -> bool {
    available + STOCK_EPSILON >= required
}

// ==========================================
// Material - 物料
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub name: String,             // 物料名称
    pub unit: String,             // 计量单位: 件、kg、m
    pub quantity_in_stock: f64,   // 库存结存
}

/// 新建物料参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaterial {
    pub name: String,
    pub unit: String,
    pub quantity_in_stock: f64,
}

// ==========================================
// MaterialRequirement - 工序物料定额
// ==========================================
// quantity_needed 为单件定额，实际扣减量 = 定额 × 订单数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub material_id: i64,
    pub quantity_needed: f64,
}

// ==========================================
// DeductionEvent - 扣减事件（追加写入，不可修改）
// ==========================================
// 在任务进入终态的同一事务内写入，按 (task_id, cycle, material_id) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionEvent {
    pub event_id: String,
    pub task_id: i64,
    pub cycle: i64,
    pub order_id: i64,
    pub stage_name: String,
    pub material_id: i64,
    pub amount: f64,
    pub deducted_at: chrono::NaiveDateTime,
}
