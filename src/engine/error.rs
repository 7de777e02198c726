// ==========================================
// 生产执行系统 - 引擎层错误类型
// ==========================================
// 职责: 业务规则失败的显式原因（不可重试）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 实体不存在 =====
    #[error("任务不存在: task_id={0}")]
    TaskNotFound(i64),

    #[error("订单不存在: order_id={0}")]
    OrderNotFound(i64),

    #[error("产品不存在: product_id={0}")]
    ProductNotFound(i64),

    #[error("人员不存在: principal_id={0}")]
    PrincipalNotFound(i64),

    #[error("物料不存在: material_id={0}")]
    MaterialNotFound(i64),

    #[error("工序模板不存在: stage_template_id={0}")]
    StageTemplateNotFound(i64),

    // ===== 业务规则 =====
    #[error("不良数量无效: defective={defective}, order_quantity={order_quantity}")]
    InvalidDefectQuantity { defective: i64, order_quantity: i64 },

    #[error("物料库存不足: {material_name}(id={material_id}) 需要 {needed}, 结存 {available}")]
    InsufficientStock {
        material_id: i64,
        material_name: String,
        needed: f64,
        available: f64,
    },

    #[error("责任人不符合要求: {0}")]
    InvalidAssignee(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ===== 数据访问 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Repository(RepositoryError::from(err))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
