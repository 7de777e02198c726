// ==========================================
// 生产执行系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎
// 红线: 引擎不拼 SQL，数据访问经由 repository
// 红线: 所有失败必须输出显式原因
// ==========================================

pub mod availability;
pub mod completion;
pub mod error;
pub mod material_report;
pub mod schedule_projector;
pub mod stock_ledger;
pub mod task_lifecycle;
pub mod template_resolver;

// 重导出核心引擎
pub use availability::{ActiveOrderDemand, AvailabilityAnalyzer, AvailabilityItem, AvailabilityReport};
pub use completion::{CompletionProcessor, CompletionResult, DeductionLogEntry};
pub use error::{EngineError, EngineResult};
pub use material_report::{DateRange, MaterialReportBuilder, MaterialReportRow, QuantitySource};
pub use schedule_projector::{GanttBar, GanttBarKind, GanttResult, OrderProjection, ScheduleProjector};
pub use stock_ledger::{plan_deductions, AppliedDeduction, PlannedDeduction, StockLedger};
pub use task_lifecycle::{CompletionTransition, TaskLifecycle};
pub use template_resolver::TemplateResolver;
