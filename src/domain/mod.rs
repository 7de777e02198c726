// ==========================================
// 生产执行系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod material;
pub mod order;
pub mod principal;
pub mod product;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use material::{stock_covers, DeductionEvent, Material, MaterialRequirement, NewMaterial, STOCK_EPSILON};
pub use order::{NewOrder, ProductionOrder, ProductionTask};
pub use principal::{NewPrincipal, Principal};
pub use product::{NewProduct, NewStageTemplate, Product, StageTemplate};
pub use types::{OrderStatus, ParseEnumError, PrincipalRole, TaskStatus};
