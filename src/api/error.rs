// ==========================================
// 生产执行系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把仓储/引擎错误转换为面向调用方的错误
// 约束: 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("责任人无效: {0}")]
    InvalidAssignee(String),

    #[error("不良数量无效: defective={defective}, order_quantity={order_quantity}")]
    InvalidDefectQuantity { defective: i64, order_quantity: i64 },

    #[error("物料不足: {material_name}(id={material_id}) 需要 {needed}, 结存 {available}")]
    InsufficientMaterial {
        material_id: i64,
        material_name: String,
        needed: f64,
        available: f64,
    },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("权限不足: {0}")]
    Forbidden(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("检查约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::TaskNotFound(id) => ApiError::NotFound(format!("任务(id={})不存在", id)),
            EngineError::OrderNotFound(id) => ApiError::NotFound(format!("订单(id={})不存在", id)),
            EngineError::ProductNotFound(id) => {
                ApiError::NotFound(format!("产品(id={})不存在", id))
            }
            EngineError::PrincipalNotFound(id) => {
                ApiError::NotFound(format!("人员(id={})不存在", id))
            }
            EngineError::MaterialNotFound(id) => {
                ApiError::NotFound(format!("物料(id={})不存在", id))
            }
            EngineError::StageTemplateNotFound(id) => {
                ApiError::NotFound(format!("工序模板(id={})不存在", id))
            }
            EngineError::InvalidDefectQuantity { defective, order_quantity } => {
                ApiError::InvalidDefectQuantity { defective, order_quantity }
            }
            EngineError::InsufficientStock {
                material_id,
                material_name,
                needed,
                available,
            } => ApiError::InsufficientMaterial {
                material_id,
                material_name,
                needed,
                available,
            },
            EngineError::InvalidAssignee(msg) => ApiError::InvalidAssignee(msg),
            EngineError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::Repository(e) => ApiError::from(e),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::not_found("Product", 3).into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Product"));
                assert!(msg.contains('3'));
            }
            other => panic!("Expected NotFound, got {other:?}"),
        }

        let api_err: ApiError = RepositoryError::UniqueConstraintViolation("code".into()).into();
        assert!(matches!(api_err, ApiError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_engine_error_conversion() {
        let api_err: ApiError = EngineError::InsufficientStock {
            material_id: 1,
            material_name: "钢板".to_string(),
            needed: 10.0,
            available: 5.0,
        }
        .into();
        match api_err {
            ApiError::InsufficientMaterial { needed, available, .. } => {
                assert_eq!(needed, 10.0);
                assert_eq!(available, 5.0);
            }
            other => panic!("Expected InsufficientMaterial, got {other:?}"),
        }

        let api_err: ApiError = EngineError::Repository(RepositoryError::LockError("poisoned".into())).into();
        assert!(matches!(api_err, ApiError::DatabaseConnectionError(_)));
    }
}
