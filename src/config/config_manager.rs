// ==========================================
// 生产执行系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ScheduleSettings - 排程投影参数快照
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// 每班分钟数（分钟换算天数的分母）
    pub shift_minutes: f64,
    /// 甘特条最小显示天数
    pub min_display_duration_days: f64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            shift_minutes: defaults::SHIFT_MINUTES,
            min_display_duration_days: defaults::MIN_DISPLAY_DURATION_DAYS,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 列出 global scope 的全部配置（键升序）
    pub fn list_global_configs(&self) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// 未显式写入的已知键以默认值补齐。
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let mut config_map = self.list_global_configs()?;
        for (key, default) in config_keys::ALL_WITH_DEFAULTS {
            config_map
                .entry(key.to_string())
                .or_insert_with(|| default.to_string());
        }
        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 排程投影配置 =====

    /// 每班分钟数（默认 480；非正数或格式错误时回退默认值）
    pub fn get_shift_minutes(&self) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::SHIFT_MINUTES, "480")?;
        match value.trim().parse::<f64>() {
            Ok(v) if v > 0.0 && v.is_finite() => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = config_keys::SHIFT_MINUTES,
                    raw_value = %value,
                    "班次分钟数配置无效，使用默认值"
                );
                Ok(defaults::SHIFT_MINUTES)
            }
        }
    }

    /// 甘特条最小显示天数（默认 0.01）
    pub fn get_min_display_duration_days(&self) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::MIN_DISPLAY_DURATION_DAYS, "0.01")?;
        match value.trim().parse::<f64>() {
            Ok(v) if v >= 0.0 && v.is_finite() => Ok(v),
            _ => Ok(defaults::MIN_DISPLAY_DURATION_DAYS),
        }
    }

    /// 返工默认备注（默认 "none"）
    pub fn get_default_rework_comment(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(
            config_keys::DEFAULT_REWORK_COMMENT,
            defaults::DEFAULT_REWORK_COMMENT,
        )
    }

    /// 排程投影参数快照
    pub fn get_schedule_settings(&self) -> Result<ScheduleSettings, Box<dyn Error>> {
        Ok(ScheduleSettings {
            shift_minutes: self.get_shift_minutes()?,
            min_display_duration_days: self.get_min_display_duration_days()?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 排程投影
    pub const SHIFT_MINUTES: &str = "shift_minutes";
    pub const MIN_DISPLAY_DURATION_DAYS: &str = "min_display_duration_days";

    // 返工
    pub const DEFAULT_REWORK_COMMENT: &str = "default_rework_comment";

    /// 已知配置键及其默认值
    pub const ALL_WITH_DEFAULTS: [(&str, &str); 3] = [
        (SHIFT_MINUTES, "480"),
        (MIN_DISPLAY_DURATION_DAYS, "0.01"),
        (DEFAULT_REWORK_COMMENT, "none"),
    ];

    pub fn is_known(key: &str) -> bool {
        ALL_WITH_DEFAULTS.iter().any(|(k, _)| *k == key)
    }
}

pub mod defaults {
    pub const SHIFT_MINUTES: f64 = 480.0;
    pub const MIN_DISPLAY_DURATION_DAYS: f64 = 0.01;
    pub const DEFAULT_REWORK_COMMENT: &str = "none";
}
