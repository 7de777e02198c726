// ==========================================
// 生产执行系统 - 工序任务状态机
// ==========================================
// 状态只前进: pending → working → (done | rework_needed)
// done / rework_needed 为终态，仅显式重开可回到 working
// ==========================================
// 纯函数: 只修改传入的任务，不访问数据库
// ==========================================

use crate::domain::order::ProductionTask;
use crate::domain::principal::Principal;
use crate::domain::types::{PrincipalRole, TaskStatus};
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;

/// 完工迁移结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTransition {
    /// 已处于终态，未做任何修改
    AlreadyTerminal(TaskStatus),
    Done,
    ReworkNeeded,
}

pub struct TaskLifecycle;

impl TaskLifecycle {
    /// 校验责任人：必须为在岗操作工
    pub fn validate_assignee(principal: &Principal) -> EngineResult<()> {
        if principal.role != PrincipalRole::Operator {
            return Err(EngineError::InvalidAssignee(format!(
                "{} 的角色为 {}，只能指派 operator",
                principal.username, principal.role
            )));
        }
        if !principal.is_active {
            return Err(EngineError::InvalidAssignee(format!(
                "{} 已停用",
                principal.username
            )));
        }
        Ok(())
    }

    /// 派工
    ///
    /// - pending → working，start_time_actual 仅在为空时写入
    /// - working 重新派工只更换责任人
    /// - 终态拒绝
    pub fn assign(
        task: &mut ProductionTask,
        principal: &Principal,
        now: NaiveDateTime,
    ) -> EngineResult<()> {
        Self::validate_assignee(principal)?;

        match task.status {
            TaskStatus::Pending => {
                task.status = TaskStatus::Working;
                if task.start_time_actual.is_none() {
                    task.start_time_actual = Some(now);
                }
            }
            TaskStatus::Working => {}
            TaskStatus::Done | TaskStatus::ReworkNeeded => {
                return Err(EngineError::InvalidStateTransition {
                    from: task.status.to_string(),
                    to: TaskStatus::Working.to_string(),
                });
            }
        }
        task.responsible_principal_id = Some(principal.id);
        Ok(())
    }

    /// 完工
    ///
    /// 未派工的 pending 任务在同一步内经过 working（补写开工时间）。
    /// 有不良 → rework_needed（不写完工时间）；无不良 → done。
    pub fn complete(
        task: &mut ProductionTask,
        defective_quantity: i64,
        now: NaiveDateTime,
    ) -> CompletionTransition {
        if task.status.is_terminal() {
            return CompletionTransition::AlreadyTerminal(task.status);
        }

        if task.status == TaskStatus::Pending {
            task.status = TaskStatus::Working;
        }
        if task.start_time_actual.is_none() {
            task.start_time_actual = Some(now);
        }

        if defective_quantity > 0 {
            task.status = TaskStatus::ReworkNeeded;
            CompletionTransition::ReworkNeeded
        } else {
            task.status = TaskStatus::Done;
            task.end_time_actual = Some(now);
            CompletionTransition::Done
        }
    }

    /// 返工重开: rework_needed → working，周期 +1
    pub fn reopen(task: &mut ProductionTask) -> EngineResult<()> {
        if task.status != TaskStatus::ReworkNeeded {
            return Err(EngineError::InvalidStateTransition {
                from: task.status.to_string(),
                to: TaskStatus::Working.to_string(),
            });
        }
        task.status = TaskStatus::Working;
        task.cycle += 1;
        Ok(())
    }
}
