// ==========================================
// 生产执行系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪（建单、派工、报工、返工、重开）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,      // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,
    pub actor: String,            // 操作人
    pub order_id: Option<i64>,
    pub task_id: Option<i64>,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    pub fn new(action_type: ActionType, actor: &str, ts: NaiveDateTime) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: ts,
            actor: actor.to_string(),
            order_id: None,
            task_id: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_order(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_task(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateOrder,     // 建单
    AssignTask,      // 派工
    CompleteTask,    // 报工完成
    TaskRework,      // 报工发现次品，进入返工
    ReopenTask,      // 返工重开
    CreateMaterial,  // 新建物料
    CreateProduct,   // 新建产品
    CreateStage,     // 新建工序模板
    CreatePrincipal, // 新建人员
    DeactivatePrincipal, // 停用人员
    UpdateConfig,    // 配置更新
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateOrder => "CreateOrder",
            ActionType::AssignTask => "AssignTask",
            ActionType::CompleteTask => "CompleteTask",
            ActionType::TaskRework => "TaskRework",
            ActionType::ReopenTask => "ReopenTask",
            ActionType::CreateMaterial => "CreateMaterial",
            ActionType::CreateProduct => "CreateProduct",
            ActionType::CreateStage => "CreateStage",
            ActionType::CreatePrincipal => "CreatePrincipal",
            ActionType::DeactivatePrincipal => "DeactivatePrincipal",
            ActionType::UpdateConfig => "UpdateConfig",
        }
    }
}
