// ==========================================
// 生产执行系统 - 生产执行 API
// ==========================================
// 职责: 派工、完工（含扣料与返工分支）、返工重开、操作日志查询
// ==========================================

use std::sync::Arc;

use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::material::DeductionEvent;
use crate::domain::order::ProductionTask;
use crate::engine::completion::{CompletionProcessor, CompletionResult};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::deduction_event_repo::DeductionEventRepository;

pub struct ProductionApi {
    processor: Arc<CompletionProcessor>,
    action_log_repo: Arc<ActionLogRepository>,
    deduction_event_repo: Arc<DeductionEventRepository>,
}

impl ProductionApi {
    pub fn new(
        processor: Arc<CompletionProcessor>,
        action_log_repo: Arc<ActionLogRepository>,
        deduction_event_repo: Arc<DeductionEventRepository>,
    ) -> Self {
        Self {
            processor,
            action_log_repo,
            deduction_event_repo,
        }
    }

    /// 指派责任人（仅 operator 且在岗）
    pub fn assign_responsible(
        &self,
        task_id: i64,
        principal_id: i64,
        actor: &str,
    ) -> ApiResult<ProductionTask> {
        Ok(self.processor.assign_responsible(task_id, principal_id, actor)?)
    }

    /// 完工
    ///
    /// # 参数
    /// - defective_quantity: 不良数量（0..=订单数量）
    /// - comment: 返工备注（缺省取配置 default_rework_comment）
    pub fn complete_task(
        &self,
        task_id: i64,
        defective_quantity: i64,
        comment: Option<&str>,
        actor: &str,
    ) -> ApiResult<CompletionResult> {
        let result = self
            .processor
            .complete_task(task_id, defective_quantity, comment, actor)
            .map_err(ApiError::from)?;
        if result.stage_template_missing {
            warn!(task_id, "完工未扣料: 工序模板缺失");
        }
        Ok(result)
    }

    /// 返工重开（rework_needed → working，新周期）
    pub fn reopen_task(&self, task_id: i64, actor: &str) -> ApiResult<ProductionTask> {
        Ok(self.processor.reopen_task(task_id, actor)?)
    }

    pub fn task_history(&self, task_id: i64) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_task(task_id)?)
    }

    pub fn task_deductions(&self, task_id: i64) -> ApiResult<Vec<DeductionEvent>> {
        Ok(self.deduction_event_repo.list_by_task(task_id)?)
    }

    pub fn recent_actions(&self, limit: i64) -> ApiResult<Vec<ActionLog>> {
        if limit <= 0 {
            return Err(ApiError::InvalidInput(format!("limit 必须为正数: {}", limit)));
        }
        Ok(self.action_log_repo.find_recent(limit)?)
    }
}
