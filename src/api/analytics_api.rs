// ==========================================
// 生产执行系统 - 分析 API
// ==========================================
// 职责: 甘特投影、物料齐套、物料消耗报表
// 红线: 只读，不修改任何记录
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ScheduleSettings};
use crate::engine::availability::{ActiveOrderDemand, AvailabilityAnalyzer, AvailabilityReport};
use crate::engine::material_report::{DateRange, MaterialReportBuilder, MaterialReportRow};
use crate::engine::schedule_projector::{GanttResult, OrderProjection, ScheduleProjector};
use crate::engine::template_resolver::TemplateResolver;
use crate::domain::order::ProductionOrder;
use crate::perf::PerfGuard;
use crate::repository::error::RepositoryError;
use crate::repository::material_repo::MaterialRepository;
use crate::repository::order_repo::OrderRepository;
use crate::repository::product_repo::ProductRepository;

pub struct AnalyticsApi {
    conn: Arc<Mutex<Connection>>,
    config: Arc<ConfigManager>,
    report_builder: MaterialReportBuilder,
}

impl AnalyticsApi {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<ConfigManager>) -> Self {
        let report_builder = MaterialReportBuilder::new(conn.clone());
        Self {
            conn,
            config,
            report_builder,
        }
    }

    fn schedule_settings(&self) -> ApiResult<ScheduleSettings> {
        self.config
            .get_schedule_settings()
            .map_err(|e| ApiError::InternalError(format!("读取排程配置失败: {}", e)))
    }

    fn lock(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        Ok(self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?)
    }

    fn project_tx(
        conn: &Connection,
        order: &ProductionOrder,
        settings: &ScheduleSettings,
    ) -> ApiResult<OrderProjection> {
        let product_name = ProductRepository::find_product_by_id_tx(conn, order.product_id)?
            .map(|p| p.name)
            .unwrap_or_default();
        let chain = TemplateResolver::resolve_chain_tx(conn, order.product_id)?;
        let tasks = OrderRepository::list_tasks_by_order_tx(conn, order.id)?;
        Ok(ScheduleProjector::project_order(
            order,
            &product_name,
            &chain,
            &tasks,
            settings,
        )?)
    }

    // ==========================================
    // 甘特投影
    // ==========================================

    pub fn project_order(&self, order_id: i64) -> ApiResult<OrderProjection> {
        let _perf = PerfGuard::new("project_order");
        let settings = self.schedule_settings()?;
        let conn = self.lock()?;
        let order = OrderRepository::find_order_by_id_tx(&conn, order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单(id={})不存在", order_id)))?;
        Self::project_tx(&conn, &order, &settings)
    }

    /// 单订单或全部订单（ID升序）的甘特数据
    pub fn project_gantt(&self, order_id: Option<i64>) -> ApiResult<GanttResult> {
        let _perf = PerfGuard::new("project_gantt");
        let settings = self.schedule_settings()?;
        let conn = self.lock()?;

        let orders = match order_id {
            Some(id) => vec![OrderRepository::find_order_by_id_tx(&conn, id)?
                .ok_or_else(|| ApiError::NotFound(format!("订单(id={})不存在", id)))?],
            None => OrderRepository::list_orders_tx(&conn)?,
        };

        let mut projections = Vec::with_capacity(orders.len());
        for order in &orders {
            projections.push(Self::project_tx(&conn, order, &settings)?);
        }
        debug!(orders = projections.len(), "甘特投影完成");
        Ok(GanttResult::from_projections(projections))
    }

    // ==========================================
    // 物料齐套
    // ==========================================

    pub fn check_availability(&self) -> ApiResult<AvailabilityReport> {
        let _perf = PerfGuard::new("check_availability");
        let conn = self.lock()?;

        let materials = MaterialRepository::list_all_tx(&conn)?;
        let orders: Vec<ProductionOrder> = OrderRepository::list_orders_tx(&conn)?
            .into_iter()
            .filter(|o| o.status.is_active())
            .collect();

        let mut inputs = Vec::with_capacity(orders.len());
        for order in &orders {
            let chain = ProductRepository::list_stages_by_product_tx(&conn, order.product_id)?;
            let tasks = OrderRepository::list_tasks_by_order_tx(&conn, order.id)?;
            inputs.push((order, chain, tasks));
        }
        let demands: Vec<ActiveOrderDemand<'_>> = inputs
            .iter()
            .map(|(order, chain, tasks)| ActiveOrderDemand {
                order,
                chain: chain.as_slice(),
                tasks: tasks.as_slice(),
            })
            .collect();

        Ok(AvailabilityAnalyzer::analyze(&materials, &demands))
    }

    // ==========================================
    // 物料消耗报表
    // ==========================================

    pub fn materials_report(&self, range: Option<DateRange>) -> ApiResult<Vec<MaterialReportRow>> {
        let _perf = PerfGuard::new("materials_report");
        Ok(self.report_builder.build(range)?)
    }
}
