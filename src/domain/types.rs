// ==========================================
// 生产执行系统 - 领域类型定义
// ==========================================
// 状态族统一为封闭枚举，所有转换点穷尽匹配
// 未知值解析失败立即报错，不做默认值兜底
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 枚举解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无法识别的{kind}取值: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,        // 新建
    InProgress, // 生产中
    Delayed,    // 延误（返工阻塞）
    Completed,  // 已完成
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Delayed => "DELAYED",
            OrderStatus::Completed => "COMPLETED",
        }
    }

    /// 是否计入在制订单（库存充足性分析口径）
    pub fn is_active(&self) -> bool {
        match self {
            OrderStatus::New | OrderStatus::InProgress | OrderStatus::Delayed => true,
            OrderStatus::Completed => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NEW" => Ok(OrderStatus::New),
            "IN_PROGRESS" => Ok(OrderStatus::InProgress),
            "DELAYED" => Ok(OrderStatus::Delayed),
            "COMPLETED" => Ok(OrderStatus::Completed),
            other => Err(ParseEnumError::new("订单状态", other)),
        }
    }
}

// ==========================================
// 工序任务状态 (Task Status)
// ==========================================
// 状态机: pending → working → (done | rework_needed)
// done / rework_needed 为当前周期的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,      // 待开工
    Working,      // 加工中
    ReworkNeeded, // 需返工
    Done,         // 已完成
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Working => "working",
            TaskStatus::ReworkNeeded => "rework_needed",
            TaskStatus::Done => "done",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        match self {
            TaskStatus::Done | TaskStatus::ReworkNeeded => true,
            TaskStatus::Pending | TaskStatus::Working => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TaskStatus::Pending),
            "working" => Ok(TaskStatus::Working),
            "rework_needed" => Ok(TaskStatus::ReworkNeeded),
            "done" => Ok(TaskStatus::Done),
            other => Err(ParseEnumError::new("任务状态", other)),
        }
    }
}

// ==========================================
// 人员角色 (Principal Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalRole {
    Dispatcher,   // 调度员：全部权限，创建订单
    Technologist, // 工艺员：维护工艺卡与基础数据
    Operator,     // 操作工：仅报工
}

impl PrincipalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalRole::Dispatcher => "dispatcher",
            PrincipalRole::Technologist => "technologist",
            PrincipalRole::Operator => "operator",
        }
    }
}

impl fmt::Display for PrincipalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "dispatcher" => Ok(PrincipalRole::Dispatcher),
            "technologist" => Ok(PrincipalRole::Technologist),
            "operator" => Ok(PrincipalRole::Operator),
            other => Err(ParseEnumError::new("人员角色", other)),
        }
    }
}
