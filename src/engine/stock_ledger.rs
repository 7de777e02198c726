// ==========================================
// 生产执行系统 - 库存台账
// ==========================================
// 红线: 库存永不为负
// 红线: 一组扣减要么全部生效，要么全部不生效
// ==========================================
// 职责: 校验并扣减物料结存
// 检查与扣减由单条条件 UPDATE 完成，运行在调用方的 IMMEDIATE 事务内
// ==========================================

use crate::domain::material::MaterialRequirement;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::material_repo::{ConditionalDeduct, MaterialRepository};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 计划扣减（按物料汇总后）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedDeduction {
    pub material_id: i64,
    pub amount: f64,
}

/// 已生效的扣减
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedDeduction {
    pub material_id: i64,
    pub amount: f64,
    pub remaining: f64,
}

/// 将工序物料定额换算为整单扣减量
///
/// 同一物料多条定额合并；输出按物料ID升序。
pub fn plan_deductions(
    requirements: &[MaterialRequirement],
    order_quantity: i64,
) -> Vec<PlannedDeduction> {
    let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
    for req in requirements {
        *totals.entry(req.material_id).or_insert(0.0) += req.quantity_needed * order_quantity as f64;
    }
    totals
        .into_iter()
        .map(|(material_id, amount)| PlannedDeduction { material_id, amount })
        .collect()
}

// ==========================================
// StockLedger
// ==========================================
pub struct StockLedger {
    conn: Arc<Mutex<Connection>>,
}

impl StockLedger {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 单物料扣减（独立事务）
    pub fn try_deduct(&self, material_id: i64, amount: f64) -> EngineResult<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| crate::repository::RepositoryError::LockError(e.to_string()))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Self::try_deduct_tx(&tx, material_id, amount)?;
        tx.commit()?;
        Ok(())
    }

    /// 单物料扣减（调用方事务内）
    ///
    /// # 返回
    /// - Ok(Some(remaining)): 已扣减
    /// - Ok(None): amount 为 0，未访问库存
    /// - Err(InsufficientStock / MaterialNotFound / InvalidInput): 未做任何修改
    pub fn try_deduct_tx(
        conn: &Connection,
        material_id: i64,
        amount: f64,
    ) -> EngineResult<Option<f64>> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "扣减量必须为非负数: material_id={}, amount={}",
                material_id, amount
            )));
        }
        if amount == 0.0 {
            return Ok(None);
        }

        match MaterialRepository::deduct_if_sufficient_tx(conn, material_id, amount)? {
            ConditionalDeduct::Deducted { remaining } => {
                debug!(material_id, amount, remaining, "库存扣减");
                Ok(Some(remaining))
            }
            ConditionalDeduct::Insufficient { available } => {
                let material_name = MaterialRepository::find_by_id_tx(conn, material_id)?
                    .map(|m| m.name)
                    .unwrap_or_default();
                Err(EngineError::InsufficientStock {
                    material_id,
                    material_name,
                    needed: amount,
                    available,
                })
            }
            ConditionalDeduct::Missing => Err(EngineError::MaterialNotFound(material_id)),
        }
    }

    /// 批量扣减（调用方事务内，物料ID升序）
    ///
    /// 首个失败立即返回；调用方丢弃事务即回滚此前已执行的扣减。
    pub fn try_deduct_all_tx(
        conn: &Connection,
        planned: &[PlannedDeduction],
    ) -> EngineResult<Vec<AppliedDeduction>> {
        let mut ordered: Vec<&PlannedDeduction> = planned.iter().collect();
        ordered.sort_by_key(|p| p.material_id);

        let mut applied = Vec::with_capacity(ordered.len());
        for p in ordered {
            if let Some(remaining) = Self::try_deduct_tx(conn, p.material_id, p.amount)? {
                applied.push(AppliedDeduction {
                    material_id: p.material_id,
                    amount: p.amount,
                    remaining,
                });
            }
        }
        Ok(applied)
    }

    /// 批量扣减（独立事务）
    pub fn try_deduct_all(&self, planned: &[PlannedDeduction]) -> EngineResult<Vec<AppliedDeduction>> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| crate::repository::RepositoryError::LockError(e.to_string()))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let applied = Self::try_deduct_all_tx(&tx, planned)?;
        tx.commit()?;
        info!(count = applied.len(), "批量库存扣减完成");
        Ok(applied)
    }
}
