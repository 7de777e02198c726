// ==========================================
// 生产执行系统 - 排程投影引擎（甘特图）
// ==========================================
// 职责: 按工艺卡顺序推进游标，生成工序条与订单汇总条
// 红线: 纯计算，不修改任何任务/订单记录
// ==========================================
// 口径:
// - 工序时长 = 单件定额 × 订单数量（分钟）
// - 游标无论实际进度如何都前移（静态前瞻排程，非实绩回放）
// - 进度: done=1.0 / working=0.5 / 其余=0.0（返工不单独区分）
// - 天数 = 分钟 / 班次分钟数，保留两位小数，最小显示值兜底
// ==========================================

use crate::config::ScheduleSettings;
use crate::domain::order::{ProductionOrder, ProductionTask};
use crate::domain::product::StageTemplate;
use crate::domain::types::TaskStatus;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GanttBarKind {
    Order,
    Stage,
}

/// 甘特条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttBar {
    pub id: String,
    pub kind: GanttBarKind,
    pub text: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub duration_minutes: i64,
    pub duration_days: f64,
    pub progress: f64,
    /// 工序条指向所属订单条
    pub parent: Option<String>,
    pub task_id: Option<i64>,
    pub task_status: Option<TaskStatus>,
}

/// 单订单投影
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProjection {
    pub order_id: i64,
    pub order_bar: GanttBar,
    pub stage_bars: Vec<GanttBar>,
}

/// 甘特数据（订单条在前，紧随其工序条）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttResult {
    pub data: Vec<GanttBar>,
}

impl GanttResult {
    pub fn from_projections(projections: Vec<OrderProjection>) -> Self {
        let mut data = Vec::new();
        for p in projections {
            data.push(p.order_bar);
            data.extend(p.stage_bars);
        }
        Self { data }
    }
}

pub fn order_bar_id(order_id: i64) -> String {
    format!("order-{}", order_id)
}

fn stage_bar_id(order_id: i64, seq: usize) -> String {
    format!("order-{}-stage-{}", order_id, seq)
}

/// 分钟 → 天（两位小数，最小显示值兜底）
pub fn minutes_to_days(minutes: i64, settings: &ScheduleSettings) -> f64 {
    let days = minutes as f64 / settings.shift_minutes;
    let rounded = (days * 100.0).round() / 100.0;
    rounded.max(settings.min_display_duration_days)
}

fn progress_of(status: Option<TaskStatus>) -> f64 {
    match status {
        Some(TaskStatus::Done) => 1.0,
        Some(TaskStatus::Working) => 0.5,
        _ => 0.0,
    }
}

/// 游标前移；超出可表示时间范围时为 None
fn advance(cursor: NaiveDateTime, minutes: i64) -> Option<NaiveDateTime> {
    Duration::try_minutes(minutes).and_then(|d| cursor.checked_add_signed(d))
}

fn out_of_range(subject: String) -> EngineError {
    EngineError::InvalidInput(format!(
        "{}排程超出可表示的时间范围，请核对数量与工时定额",
        subject
    ))
}

pub struct ScheduleProjector;

impl ScheduleProjector {
    /// 按工艺卡推算的完工时间（建单前校验用）
    pub fn projected_end(
        start: NaiveDateTime,
        chain: &[StageTemplate],
        quantity: i64,
    ) -> EngineResult<NaiveDateTime> {
        let mut cursor = start;
        for stage in chain {
            cursor = stage
                .duration_minutes(quantity)
                .and_then(|m| advance(cursor, m))
                .ok_or_else(|| out_of_range(format!("数量={}时", quantity)))?;
        }
        Ok(cursor)
    }

    /// 投影单个订单
    ///
    /// # 参数
    /// - order: 订单
    /// - product_name: 产品名称（订单条文本）
    /// - chain: 已排序的工艺卡
    /// - tasks: 订单下的任务（按 stage_name 匹配）
    ///
    /// # 错误
    /// - InvalidInput: 工时乘积或时间轴溢出
    pub fn project_order(
        order: &ProductionOrder,
        product_name: &str,
        chain: &[StageTemplate],
        tasks: &[ProductionTask],
        settings: &ScheduleSettings,
    ) -> EngineResult<OrderProjection> {
        let parent_id = order_bar_id(order.id);
        let mut cursor = order.start_date;
        let mut total_minutes: i64 = 0;
        let mut completed_minutes: i64 = 0;
        let mut stage_bars = Vec::with_capacity(chain.len());

        for (idx, stage) in chain.iter().enumerate() {
            let duration_minutes = stage
                .duration_minutes(order.quantity)
                .ok_or_else(|| out_of_range(format!("订单(id={})", order.id)))?;
            let task = tasks.iter().find(|t| t.stage_name == stage.name);
            let status = task.map(|t| t.status);
            let progress = progress_of(status);

            total_minutes = total_minutes
                .checked_add(duration_minutes)
                .ok_or_else(|| out_of_range(format!("订单(id={})", order.id)))?;
            if progress >= 1.0 {
                completed_minutes += duration_minutes;
            }

            let end = advance(cursor, duration_minutes)
                .ok_or_else(|| out_of_range(format!("订单(id={})", order.id)))?;
            stage_bars.push(GanttBar {
                id: stage_bar_id(order.id, idx + 1),
                kind: GanttBarKind::Stage,
                text: stage.name.clone(),
                start_date: cursor,
                end_date: end,
                duration_minutes,
                duration_days: minutes_to_days(duration_minutes, settings),
                progress,
                parent: Some(parent_id.clone()),
                task_id: task.map(|t| t.id),
                task_status: status,
            });
            cursor = end;
        }

        let order_progress = if total_minutes == 0 {
            0.0
        } else {
            completed_minutes as f64 / total_minutes as f64
        };

        let order_bar = GanttBar {
            id: parent_id,
            kind: GanttBarKind::Order,
            text: format!("订单 #{} ({})", order.id, product_name),
            start_date: order.start_date,
            end_date: cursor,
            duration_minutes: total_minutes,
            duration_days: minutes_to_days(total_minutes, settings),
            progress: order_progress,
            parent: None,
            task_id: None,
            task_status: None,
        };

        Ok(OrderProjection {
            order_id: order.id,
            order_bar,
            stage_bars,
        })
    }
}
