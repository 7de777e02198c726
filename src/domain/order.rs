// ==========================================
// 生产执行系统 - 生产订单与工序任务领域模型
// ==========================================
// 任务在订单创建时按工艺卡一次性生成，stage_name 为按名称快照
// 工艺卡后续变更不回溯影响历史任务
// ==========================================

use crate::domain::types::{OrderStatus, TaskStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionOrder - 生产订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub id: i64,
    pub client_name: String,
    pub product_id: i64,
    pub quantity: i64, // 生产数量（正整数）
    pub start_date: NaiveDateTime,
    pub deadline_date: NaiveDateTime,
    pub status: OrderStatus,
}

/// 新建订单参数（仓储层）
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_name: String,
    pub product_id: i64,
    pub quantity: i64,
    pub start_date: NaiveDateTime,
    pub deadline_date: NaiveDateTime,
}

// ==========================================
// ProductionTask - 工序任务
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionTask {
    pub id: i64,
    pub order_id: i64,
    pub seq_no: i64,         // 在订单内的工序序号（从 1 开始）
    pub stage_name: String,  // 工序名称快照
    pub status: TaskStatus,
    pub responsible_principal_id: Option<i64>,
    pub start_time_actual: Option<NaiveDateTime>,
    pub end_time_actual: Option<NaiveDateTime>,
    pub cycle: i64,          // 加工周期，返工重开后递增
}
