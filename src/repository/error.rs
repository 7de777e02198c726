// ==========================================
// 生产执行系统 - 仓储层错误类型
// ==========================================
// 层次: RepositoryError → EngineError → ApiError
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
///
/// 约束类失败按 SQLite 扩展错误码归类，其余一律视为查询失败
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("{entity}(id={id})不存在")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 约束 =====
    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    /// 例如库存 CHECK(quantity_in_stock >= 0)
    #[error("检查约束违反: {0}")]
    CheckConstraintViolation(String),

    /// 行内字段无法解析（未知状态码、时间格式错误）
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        match err {
            rusqlite::Error::SqliteFailure(code, msg) => {
                let msg = msg.unwrap_or_else(|| code.to_string());
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        RepositoryError::UniqueConstraintViolation(msg)
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => RepositoryError::ForeignKeyViolation(msg),
                    ffi::SQLITE_CONSTRAINT_CHECK => RepositoryError::CheckConstraintViolation(msg),
                    _ => RepositoryError::DatabaseQueryError(msg),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::not_found("记录", "?"),
            rusqlite::Error::FromSqlConversionFailure(idx, _, inner) => {
                RepositoryError::FieldValueError {
                    field: format!("column#{}", idx),
                    message: inner.to_string(),
                }
            }
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
