// ==========================================
// 生产执行系统 - 完工与返工处理器
// ==========================================
// 红线: 每个任务周期最多扣减一次，且只发生在进入 done / rework_needed 的那一步
// 红线: 库存、扣减事件、任务、订单、审计日志在同一 IMMEDIATE 事务内落库
// ==========================================
// 流程: 定额 → 库存校验 → 扣减 → 良品/不良拆分 → 任务/订单状态迁移
// ==========================================

use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::material::DeductionEvent;
use crate::domain::order::{ProductionOrder, ProductionTask};
use crate::domain::types::{OrderStatus, TaskStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::stock_ledger::{plan_deductions, StockLedger};
use crate::engine::task_lifecycle::{CompletionTransition, TaskLifecycle};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::deduction_event_repo::DeductionEventRepository;
use crate::repository::error::RepositoryError;
use crate::repository::material_repo::MaterialRepository;
use crate::repository::order_repo::OrderRepository;
use crate::repository::principal_repo::PrincipalRepository;
use crate::repository::product_repo::ProductRepository;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 无责任人时审计日志中的占位名
pub const UNASSIGNED_LABEL: &str = "未指派";

/// 单条扣减记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionLogEntry {
    pub material_id: i64,
    pub material_name: String,
    pub unit: String,
    pub amount: f64,
    pub remaining: f64,
}

impl fmt::Display for DeductionLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "扣减 {} {} {}", self.material_name, self.amount, self.unit)
    }
}

/// 完工结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub task_id: i64,
    pub status: TaskStatus,
    pub order_status: OrderStatus,
    pub good_quantity: i64,
    pub defective_quantity: i64,
    pub deduction_log: Vec<DeductionLogEntry>,
    /// 任务此前已处于终态，本次调用未做任何修改
    pub already_terminal: bool,
    /// 按名称找不到工序模板，按无定额处理
    pub stage_template_missing: bool,
}

// ==========================================
// CompletionProcessor
// ==========================================
pub struct CompletionProcessor {
    conn: Arc<Mutex<Connection>>,
    config: Arc<ConfigManager>,
}

impl CompletionProcessor {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<ConfigManager>) -> Self {
        Self { conn, config }
    }

    fn lock(&self) -> EngineResult<std::sync::MutexGuard<Connection>> {
        Ok(self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?)
    }

    /// 读取返工默认备注（需在获取连接锁之前调用）
    fn default_rework_comment(&self) -> String {
        match self.config.get_default_rework_comment() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "读取返工默认备注失败，使用默认值");
                crate::config::config_manager::defaults::DEFAULT_REWORK_COMMENT.to_string()
            }
        }
    }

    // ==========================================
    // 派工
    // ==========================================

    pub fn assign_responsible(
        &self,
        task_id: i64,
        principal_id: i64,
        actor: &str,
    ) -> EngineResult<ProductionTask> {
        self.assign_responsible_at(task_id, principal_id, actor, Utc::now().naive_utc())
    }

    pub fn assign_responsible_at(
        &self,
        task_id: i64,
        principal_id: i64,
        actor: &str,
        now: NaiveDateTime,
    ) -> EngineResult<ProductionTask> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut task = OrderRepository::find_task_by_id_tx(&tx, task_id)?
            .ok_or(EngineError::TaskNotFound(task_id))?;
        let principal = PrincipalRepository::find_by_id_tx(&tx, principal_id)?
            .ok_or(EngineError::PrincipalNotFound(principal_id))?;
        let order = OrderRepository::find_order_by_id_tx(&tx, task.order_id)?
            .ok_or(EngineError::OrderNotFound(task.order_id))?;

        let before = task.status;
        TaskLifecycle::assign(&mut task, &principal, now)?;
        OrderRepository::update_task_tx(&tx, &task)?;

        if order.status == OrderStatus::New {
            OrderRepository::update_order_status_tx(&tx, order.id, OrderStatus::InProgress)?;
        }

        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(ActionType::AssignTask, actor, now)
                .with_task(task.id)
                .with_order(order.id)
                .with_payload(json!({
                    "principal_id": principal.id,
                    "from_status": before.as_str(),
                    "to_status": task.status.as_str(),
                }))
                .with_detail(format!("责任人: {}", principal.display_name())),
        )?;

        tx.commit()?;
        info!(task_id, principal_id, status = %task.status, "任务已派工");
        Ok(task)
    }

    // ==========================================
    // 完工
    // ==========================================

    pub fn complete_task(
        &self,
        task_id: i64,
        defective_quantity: i64,
        comment: Option<&str>,
        actor: &str,
    ) -> EngineResult<CompletionResult> {
        self.complete_task_at(task_id, defective_quantity, comment, actor, Utc::now().naive_utc())
    }

    pub fn complete_task_at(
        &self,
        task_id: i64,
        defective_quantity: i64,
        comment: Option<&str>,
        actor: &str,
        now: NaiveDateTime,
    ) -> EngineResult<CompletionResult> {
        let comment = match comment.map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => self.default_rework_comment(),
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // === 步骤 1: 任务与订单 ===
        let mut task = OrderRepository::find_task_by_id_tx(&tx, task_id)?
            .ok_or(EngineError::TaskNotFound(task_id))?;
        let order = OrderRepository::find_order_by_id_tx(&tx, task.order_id)?
            .ok_or(EngineError::OrderNotFound(task.order_id))?;

        if task.status.is_terminal() {
            info!(task_id, status = %task.status, "任务已处于终态，忽略重复完工");
            return Ok(CompletionResult {
                task_id,
                status: task.status,
                order_status: order.status,
                good_quantity: 0,
                defective_quantity: 0,
                deduction_log: Vec::new(),
                already_terminal: true,
                stage_template_missing: false,
            });
        }

        // === 步骤 2: 不良数量校验 ===
        if defective_quantity < 0 || defective_quantity > order.quantity {
            return Err(EngineError::InvalidDefectQuantity {
                defective: defective_quantity,
                order_quantity: order.quantity,
            });
        }

        // === 步骤 3: 工序模板 ===
        let stage = ProductRepository::find_stage_by_name_tx(&tx, order.product_id, &task.stage_name)?;
        let stage_template_missing = stage.is_none();
        if stage_template_missing {
            warn!(
                task_id,
                order_id = order.id,
                stage_name = %task.stage_name,
                "工序模板缺失，按无物料定额完工"
            );
        }
        let requirements = stage.map(|s| s.requirements).unwrap_or_default();

        // === 步骤 4: 扣减（整单数量，物料ID升序，全有或全无）===
        let planned = plan_deductions(&requirements, order.quantity);
        let applied = StockLedger::try_deduct_all_tx(&tx, &planned)?;

        let mut deduction_log = Vec::with_capacity(applied.len());
        for a in &applied {
            let material = MaterialRepository::find_by_id_tx(&tx, a.material_id)?
                .ok_or(EngineError::MaterialNotFound(a.material_id))?;
            DeductionEventRepository::insert_tx(
                &tx,
                &DeductionEvent {
                    event_id: uuid::Uuid::new_v4().to_string(),
                    task_id: task.id,
                    cycle: task.cycle,
                    order_id: order.id,
                    stage_name: task.stage_name.clone(),
                    material_id: a.material_id,
                    amount: a.amount,
                    deducted_at: now,
                },
            )?;
            deduction_log.push(DeductionLogEntry {
                material_id: material.id,
                material_name: material.name,
                unit: material.unit,
                amount: a.amount,
                remaining: a.remaining,
            });
        }

        // === 步骤 5/6: 状态迁移 ===
        let good_quantity = order.quantity - defective_quantity;
        let transition = TaskLifecycle::complete(&mut task, defective_quantity, now);
        OrderRepository::update_task_tx(&tx, &task)?;

        let order_status = match transition {
            CompletionTransition::ReworkNeeded => OrderStatus::Delayed,
            _ => Self::order_status_after_done_tx(&tx, &order)?,
        };
        if order_status != order.status {
            OrderRepository::update_order_status_tx(&tx, order.id, order_status)?;
        }

        // === 步骤 7: 审计 ===
        let payload = json!({
            "cycle": task.cycle,
            "good_quantity": good_quantity,
            "defective_quantity": defective_quantity,
            "stage_template_missing": stage_template_missing,
            "deductions": deduction_log,
        });
        let log = if transition == CompletionTransition::ReworkNeeded {
            let responsible = match task.responsible_principal_id {
                Some(pid) => PrincipalRepository::find_by_id_tx(&tx, pid)?
                    .map(|p| p.display_name())
                    .unwrap_or_else(|| UNASSIGNED_LABEL.to_string()),
                None => UNASSIGNED_LABEL.to_string(),
            };
            ActionLog::new(ActionType::TaskRework, actor, now).with_detail(format!(
                "返工: 工序={}, 责任人={}, 备注={}, 不良数={}",
                task.stage_name, responsible, comment, defective_quantity
            ))
        } else {
            ActionLog::new(ActionType::CompleteTask, actor, now)
                .with_detail(format!("完工: 工序={}, 良品数={}", task.stage_name, good_quantity))
        };
        ActionLogRepository::insert_tx(
            &tx,
            &log.with_task(task.id).with_order(order.id).with_payload(payload),
        )?;

        tx.commit()?;

        info!(
            task_id,
            order_id = order.id,
            status = %task.status,
            order_status = %order_status,
            deductions = deduction_log.len(),
            "任务完工处理完成"
        );

        Ok(CompletionResult {
            task_id,
            status: task.status,
            order_status,
            good_quantity,
            defective_quantity,
            deduction_log,
            already_terminal: false,
            stage_template_missing,
        })
    }

    /// 任务完工后订单应处的状态
    fn order_status_after_done_tx(
        conn: &Connection,
        order: &ProductionOrder,
    ) -> EngineResult<OrderStatus> {
        let tasks = OrderRepository::list_tasks_by_order_tx(conn, order.id)?;
        if !tasks.is_empty() && tasks.iter().all(|t| t.status == TaskStatus::Done) {
            return Ok(OrderStatus::Completed);
        }
        Ok(match order.status {
            OrderStatus::New => OrderStatus::InProgress,
            other => other,
        })
    }

    // ==========================================
    // 返工重开
    // ==========================================

    pub fn reopen_task(&self, task_id: i64, actor: &str) -> EngineResult<ProductionTask> {
        let now = Utc::now().naive_utc();
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut task = OrderRepository::find_task_by_id_tx(&tx, task_id)?
            .ok_or(EngineError::TaskNotFound(task_id))?;
        TaskLifecycle::reopen(&mut task)?;
        OrderRepository::update_task_tx(&tx, &task)?;

        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(ActionType::ReopenTask, actor, now)
                .with_task(task.id)
                .with_order(task.order_id)
                .with_payload(json!({ "cycle": task.cycle })),
        )?;

        tx.commit()?;
        info!(task_id, cycle = task.cycle, "返工任务已重开");
        Ok(task)
    }
}
