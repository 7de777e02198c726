// ==========================================
// 生产执行系统 - 产品与工艺卡领域模型
// ==========================================
// 工艺卡 = 产品的有序工序模板链，按 order_in_chain 升序
// ==========================================

use crate::domain::material::MaterialRequirement;
use serde::{Deserialize, Serialize};

// ==========================================
// Product - 产品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub code: String, // 唯一编码
    pub description: Option<String>,
}

/// 新建产品参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

// ==========================================
// StageTemplate - 工序模板
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTemplate {
    pub id: i64,
    pub product_id: i64,
    pub name: String,            // 产品内唯一
    pub order_in_chain: i64,     // 正整数，产品内唯一
    pub norm_time_minutes: i64,  // 单件工时定额（分钟）
    pub requirements: Vec<MaterialRequirement>,
}

impl StageTemplate {
    /// 本工序对整单的工时（分钟），乘积溢出时为 None
    pub fn duration_minutes(&self, order_quantity: i64) -> Option<i64> {
        self.norm_time_minutes.checked_mul(order_quantity)
    }
}

/// 新建工序模板参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStageTemplate {
    pub product_id: i64,
    pub name: String,
    pub order_in_chain: i64,
    pub norm_time_minutes: i64,
    pub requirements: Vec<MaterialRequirement>,
}
