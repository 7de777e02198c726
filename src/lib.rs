// ==========================================
// 生产执行系统 - 核心库
// ==========================================
// 职责: 订单分解为工序任务、报工扣料、返工、甘特投影、物料可用性与耗用报表
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// SQL 性能追踪
pub mod perf;

// 边界角色校验
pub mod security;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OrderStatus, PrincipalRole, TaskStatus};

// 领域实体
pub use domain::{
    ActionLog, ActionType, DeductionEvent, Material, Principal, Product, ProductionOrder,
    ProductionTask, StageTemplate,
};

// 引擎
pub use engine::{
    AvailabilityAnalyzer, CompletionProcessor, MaterialReportBuilder, ScheduleProjector,
    StockLedger, TaskLifecycle, TemplateResolver,
};

// API
pub use api::{AnalyticsApi, CatalogApi, ConfigApi, OrderApi, ProductionApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "生产执行系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
