// ==========================================
// 生产执行系统 - 配置层
// ==========================================
// 职责: 系统配置管理（config_kv 全局作用域）与启动期认证参数
// 存储: config_kv 表
// ==========================================

pub mod auth_settings;
pub mod config_manager;

// 重导出核心配置管理器
pub use auth_settings::AuthSettings;
pub use config_manager::{config_keys, ConfigManager, ScheduleSettings};
