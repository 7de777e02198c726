// ==========================================
// 生产执行系统 - 物料消耗报表
// ==========================================
// 行来源: 已完工(done)任务，完工日期 = end_time_actual
// 数量来源:
// - RECORDED: 该任务最终周期的扣减事件
// - RECOMPUTED: 无扣减事件时按当前工艺卡定额 × 订单数量重算
// ==========================================

use crate::domain::order::ProductionTask;
use crate::domain::types::TaskStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::stock_ledger::plan_deductions;
use crate::repository::deduction_event_repo::DeductionEventRepository;
use crate::repository::error::RepositoryError;
use crate::repository::material_repo::MaterialRepository;
use crate::repository::order_repo::OrderRepository;
use crate::repository::product_repo::ProductRepository;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// 日期区间（含两端）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> EngineResult<Self> {
        if from > to {
            return Err(EngineError::InvalidInput(format!(
                "日期区间无效: from={} > to={}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        let d = ts.date();
        d >= self.from && d <= self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantitySource {
    Recorded,
    Recomputed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialReportRow {
    pub order_id: i64,
    pub product_name: String,
    pub stage_name: String,
    pub material_id: i64,
    pub material_name: String,
    pub unit: String,
    pub quantity_spent: f64,
    pub completion_date: Option<NaiveDateTime>,
    pub source: QuantitySource,
}

pub struct MaterialReportBuilder {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialReportBuilder {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn build(&self, range: Option<DateRange>) -> EngineResult<Vec<MaterialReportRow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Self::build_tx(&conn, range)
    }

    pub fn build_tx(conn: &Connection, range: Option<DateRange>) -> EngineResult<Vec<MaterialReportRow>> {
        let tasks: Vec<ProductionTask> = OrderRepository::list_tasks_by_status_tx(conn, TaskStatus::Done)?
            .into_iter()
            .filter(|t| match (&range, &t.end_time_actual) {
                (None, _) => true,
                (Some(r), Some(end)) => r.contains(end),
                (Some(_), None) => false,
            })
            .collect();

        let materials: HashMap<i64, (String, String)> = MaterialRepository::list_all_tx(conn)?
            .into_iter()
            .map(|m| (m.id, (m.name, m.unit)))
            .collect();
        let mut product_names: HashMap<i64, String> = HashMap::new();

        let mut rows = Vec::new();
        for task in tasks {
            let order = OrderRepository::find_order_by_id_tx(conn, task.order_id)?
                .ok_or(EngineError::OrderNotFound(task.order_id))?;
            let product_name = match product_names.get(&order.product_id) {
                Some(n) => n.clone(),
                None => {
                    let name = ProductRepository::find_product_by_id_tx(conn, order.product_id)?
                        .map(|p| p.name)
                        .unwrap_or_default();
                    product_names.insert(order.product_id, name.clone());
                    name
                }
            };

            let events = DeductionEventRepository::list_by_task_cycle_tx(conn, task.id, task.cycle)?;
            let (amounts, source): (Vec<(i64, f64)>, QuantitySource) = if !events.is_empty() {
                (
                    events.iter().map(|e| (e.material_id, e.amount)).collect(),
                    QuantitySource::Recorded,
                )
            } else {
                let reqs = ProductRepository::find_stage_by_name_tx(conn, order.product_id, &task.stage_name)?
                    .map(|s| s.requirements)
                    .unwrap_or_default();
                debug!(task_id = task.id, "无扣减事件，按工艺卡重算");
                (
                    plan_deductions(&reqs, order.quantity)
                        .into_iter()
                        .map(|p| (p.material_id, p.amount))
                        .collect(),
                    QuantitySource::Recomputed,
                )
            };

            for (material_id, amount) in amounts {
                let (material_name, unit) = materials
                    .get(&material_id)
                    .cloned()
                    .unwrap_or_default();
                rows.push(MaterialReportRow {
                    order_id: order.id,
                    product_name: product_name.clone(),
                    stage_name: task.stage_name.clone(),
                    material_id,
                    material_name,
                    unit,
                    quantity_spent: amount,
                    completion_date: task.end_time_actual,
                    source,
                });
            }
        }
        Ok(rows)
    }
}
