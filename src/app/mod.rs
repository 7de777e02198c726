// ==========================================
// 生产执行系统 - 应用层
// ==========================================
// 职责: 装配共享连接与各层实例，供外部入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
