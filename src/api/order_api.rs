// ==========================================
// 生产执行系统 - 订单 API
// ==========================================
// 职责: 订单创建（同事务生成工序任务）、订单与任务查询
// 红线: 订单与其全部任务一次性创建，按工艺卡顺序，不可部分生成
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::{NewOrder, ProductionOrder, ProductionTask};
use crate::engine::schedule_projector::ScheduleProjector;
use crate::engine::template_resolver::TemplateResolver;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::RepositoryError;
use crate::repository::order_repo::OrderRepository;

/// 创建订单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub client_name: String,
    pub product_id: i64,
    pub quantity: i64,
    pub deadline_date: NaiveDateTime,
    /// 缺省为当前时间
    pub start_date: Option<NaiveDateTime>,
}

/// 订单 + 任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithTasks {
    pub order: ProductionOrder,
    pub tasks: Vec<ProductionTask>,
}

pub struct OrderApi {
    conn: Arc<Mutex<Connection>>,
    order_repo: Arc<OrderRepository>,
}

impl OrderApi {
    pub fn new(conn: Arc<Mutex<Connection>>, order_repo: Arc<OrderRepository>) -> Self {
        Self { conn, order_repo }
    }

    // ==========================================
    // 写入接口
    // ==========================================

    /// 创建订单并按工艺卡生成待开工任务
    ///
    /// # 返回
    /// - Ok(OrderWithTasks): 新订单（状态 NEW）及其任务（seq_no 从 1 开始）
    /// - Err(InvalidInput): 数量非正 / 客户名为空 / 交期早于开工 / 排程超出时间范围
    /// - Err(NotFound): 产品不存在
    pub fn create_order(&self, req: CreateOrderRequest, actor: &str) -> ApiResult<OrderWithTasks> {
        let client_name = req.client_name.trim();
        if client_name.is_empty() {
            return Err(ApiError::InvalidInput("客户名称不能为空".to_string()));
        }
        if req.quantity <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "订单数量必须为正整数: {}",
                req.quantity
            )));
        }
        let now = Utc::now().naive_utc();
        let start_date = req.start_date.unwrap_or(now);
        if req.deadline_date < start_date {
            return Err(ApiError::InvalidInput(format!(
                "交期({})早于开工日期({})",
                req.deadline_date, start_date
            )));
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        let chain = TemplateResolver::resolve_chain_tx(&tx, req.product_id)?;
        // 数量过大导致排程时间轴无法表示时拒绝建单
        ScheduleProjector::projected_end(start_date, &chain, req.quantity)?;

        let order_id = OrderRepository::insert_order_tx(
            &tx,
            &NewOrder {
                client_name: client_name.to_string(),
                product_id: req.product_id,
                quantity: req.quantity,
                start_date,
                deadline_date: req.deadline_date,
            },
        )?;
        for (idx, stage) in chain.iter().enumerate() {
            OrderRepository::insert_task_tx(&tx, order_id, idx as i64 + 1, &stage.name)?;
        }

        ActionLogRepository::insert_tx(
            &tx,
            &ActionLog::new(ActionType::CreateOrder, actor, now)
                .with_order(order_id)
                .with_payload(json!({
                    "product_id": req.product_id,
                    "quantity": req.quantity,
                    "stages": chain.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
                })),
        )?;

        let order = OrderRepository::find_order_by_id_tx(&tx, order_id)?
            .ok_or_else(|| ApiError::InternalError(format!("订单{}写入后读取失败", order_id)))?;
        let tasks = OrderRepository::list_tasks_by_order_tx(&tx, order_id)?;

        tx.commit().map_err(RepositoryError::from)?;

        info!(order_id, product_id = req.product_id, tasks = tasks.len(), "订单已创建");
        Ok(OrderWithTasks { order, tasks })
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_order(&self, order_id: i64) -> ApiResult<OrderWithTasks> {
        let order = self
            .order_repo
            .find_order_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单(id={})不存在", order_id)))?;
        let tasks = self.order_repo.list_tasks_by_order(order_id)?;
        Ok(OrderWithTasks { order, tasks })
    }

    pub fn list_orders(&self) -> ApiResult<Vec<ProductionOrder>> {
        let orders = self.order_repo.list_orders()?;
        debug!(count = orders.len(), "查询订单列表");
        Ok(orders)
    }

    /// 查询任务（指定订单或全部）
    pub fn list_tasks(&self, order_id: Option<i64>) -> ApiResult<Vec<ProductionTask>> {
        let tasks = match order_id {
            Some(id) => {
                if self.order_repo.find_order_by_id(id)?.is_none() {
                    return Err(ApiError::NotFound(format!("订单(id={})不存在", id)));
                }
                self.order_repo.list_tasks_by_order(id)?
            }
            None => self.order_repo.list_all_tasks()?,
        };
        Ok(tasks)
    }
}
