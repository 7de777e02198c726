// ==========================================
// 生产执行系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: *_tx 关联函数接收调用方持有的连接/事务，供引擎组合为单一事务
// ==========================================

pub mod action_log_repo;
pub mod codec;
pub mod deduction_event_repo;
pub mod error;
pub mod material_repo;
pub mod order_repo;
pub mod principal_repo;
pub mod product_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use deduction_event_repo::DeductionEventRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use material_repo::{ConditionalDeduct, MaterialRepository};
pub use order_repo::OrderRepository;
pub use principal_repo::PrincipalRepository;
pub use product_repo::ProductRepository;
