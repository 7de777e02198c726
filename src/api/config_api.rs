// ==========================================
// 生产执行系统 - 配置 API
// ==========================================
// 职责: 全局配置的查询与修改（仅已知键）
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::action_log_repo::ActionLogRepository;

pub struct ConfigApi {
    config: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ConfigApi {
    pub fn new(config: Arc<ConfigManager>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            config,
            action_log_repo,
        }
    }

    /// 全部已知配置（未写入的键取默认值）
    pub fn list_configs(&self) -> ApiResult<BTreeMap<String, String>> {
        let snapshot = self
            .config
            .get_config_snapshot()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        serde_json::from_str(&snapshot).map_err(|e| ApiError::InternalError(e.to_string()))
    }

    pub fn get_config(&self, key: &str) -> ApiResult<String> {
        if !config_keys::is_known(key) {
            return Err(ApiError::NotFound(format!("配置项不存在: {}", key)));
        }
        self.list_configs()?
            .remove(key)
            .ok_or_else(|| ApiError::NotFound(format!("配置项不存在: {}", key)))
    }

    /// 修改配置（写入前按键校验取值）
    pub fn update_config(&self, key: &str, value: &str, actor: &str) -> ApiResult<()> {
        let value = value.trim();
        match key {
            config_keys::SHIFT_MINUTES => match value.parse::<f64>() {
                Ok(v) if v > 0.0 && v.is_finite() => {}
                _ => {
                    return Err(ApiError::InvalidInput(format!(
                        "{} 必须为正数: {}",
                        key, value
                    )))
                }
            },
            config_keys::MIN_DISPLAY_DURATION_DAYS => match value.parse::<f64>() {
                Ok(v) if v >= 0.0 && v.is_finite() => {}
                _ => {
                    return Err(ApiError::InvalidInput(format!(
                        "{} 必须为非负数: {}",
                        key, value
                    )))
                }
            },
            config_keys::DEFAULT_REWORK_COMMENT => {
                if value.is_empty() {
                    return Err(ApiError::InvalidInput(format!("{} 不能为空", key)));
                }
            }
            _ => return Err(ApiError::NotFound(format!("配置项不存在: {}", key))),
        }

        // 旧值按生效值记录（未写入时为默认值）
        let old = self.get_config(key)?;
        self.config
            .set_global_config_value(key, value)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::UpdateConfig, actor, Utc::now().naive_utc())
                .with_payload(json!({ "key": key, "old": old, "new": value })),
        )?;
        info!(key, value, "配置已更新");
        Ok(())
    }
}
