// ==========================================
// 生产执行系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、仓储、引擎和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{AnalyticsApi, CatalogApi, ConfigApi, OrderApi, ProductionApi};
use crate::config::{AuthSettings, ConfigManager};
use crate::engine::{CompletionProcessor, TemplateResolver};
use crate::perf::{install_sqlite_tracing, PerfSettings};
use crate::repository::{
    ActionLogRepository, DeductionEventRepository, MaterialRepository, OrderRepository,
    PrincipalRepository, ProductRepository,
};

/// 数据库路径环境变量
pub const ENV_DB_PATH: &str = "PRODUCTION_MES_DB_PATH";

/// 应用状态
///
/// 全部仓储共享同一个 `Arc<Mutex<Connection>>`
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub order_api: Arc<OrderApi>,
    pub production_api: Arc<ProductionApi>,
    pub analytics_api: Arc<AnalyticsApi>,
    pub catalog_api: Arc<CatalogApi>,
    pub config_api: Arc<ConfigApi>,

    /// 认证参数（启动时读取，核心不使用）
    pub auth_settings: AuthSettings,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 打开数据库、建表、装配仓储 → 引擎 → API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::ensure_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        install_sqlite_tracing(&mut conn, PerfSettings::from_env());

        let mut state = Self::from_connection(Arc::new(Mutex::new(conn)))?;
        state.db_path = db_path;
        tracing::info!("AppState初始化完成");
        Ok(state)
    }

    /// 基于已有连接装配（连接需已建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        // ==========================================
        // Repository 层
        // ==========================================
        let material_repo = Arc::new(MaterialRepository::new(conn.clone()));
        let product_repo = Arc::new(ProductRepository::new(conn.clone()));
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let principal_repo = Arc::new(PrincipalRepository::new(conn.clone()));
        let deduction_event_repo = Arc::new(DeductionEventRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // Engine 层
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let resolver = Arc::new(TemplateResolver::new(product_repo.clone()));
        let processor = Arc::new(CompletionProcessor::new(conn.clone(), config_manager.clone()));

        // ==========================================
        // API 层
        // ==========================================
        let order_api = Arc::new(OrderApi::new(conn.clone(), order_repo));
        let production_api = Arc::new(ProductionApi::new(
            processor,
            action_log_repo.clone(),
            deduction_event_repo,
        ));
        let analytics_api = Arc::new(AnalyticsApi::new(conn, config_manager.clone()));
        let catalog_api = Arc::new(CatalogApi::new(
            material_repo,
            product_repo,
            principal_repo,
            action_log_repo.clone(),
            resolver,
        ));
        let config_api = Arc::new(ConfigApi::new(config_manager, action_log_repo));

        Ok(Self {
            db_path: String::new(),
            order_api,
            production_api,
            analytics_api,
            catalog_api,
            config_api,
            auth_settings: AuthSettings::from_env(),
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - `PRODUCTION_MES_DB_PATH` 非空时直接使用
/// - 开发环境: 用户数据目录/production-mes-dev/production_mes.db
/// - 生产环境: 用户数据目录/production-mes/production_mes.db
/// - 无用户数据目录时: ./production_mes.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./production_mes.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = if cfg!(debug_assertions) {
            data_dir.join("production-mes-dev")
        } else {
            data_dir.join("production-mes")
        };
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("production_mes.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_from_connection_wires_apis() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let state = AppState::from_connection(Arc::new(Mutex::new(conn))).unwrap();

        assert!(state.order_api.list_orders().unwrap().is_empty());
        assert!(state.analytics_api.check_availability().unwrap().items.is_empty());
        assert_eq!(state.config_api.get_config("shift_minutes").unwrap(), "480");
    }
}
