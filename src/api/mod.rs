// ==========================================
// 生产执行系统 - API 层
// ==========================================
// 职责: 面向外部调用方（HTTP/GUI 层）的同步接口
// 约束: 参数校验在此完成，业务规则委托给引擎层
// ==========================================

pub mod analytics_api;
pub mod catalog_api;
pub mod config_api;
pub mod error;
pub mod order_api;
pub mod production_api;

pub use analytics_api::AnalyticsApi;
pub use catalog_api::CatalogApi;
pub use config_api::ConfigApi;
pub use error::{ApiError, ApiResult};
pub use order_api::{CreateOrderRequest, OrderApi, OrderWithTasks};
pub use production_api::ProductionApi;
