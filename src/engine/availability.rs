// ==========================================
// 生产执行系统 - 物料齐套分析
// ==========================================
// 职责: 汇总在制订单未完工工序的物料需求，与当前结存对比
// 口径: 订单状态 ∈ {NEW, IN_PROGRESS, DELAYED}; 工序任务非 done 即计入需求
// ==========================================

use crate::domain::material::{stock_covers, Material};
use crate::domain::order::{ProductionOrder, ProductionTask};
use crate::domain::product::StageTemplate;
use crate::domain::types::TaskStatus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 单物料齐套结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityItem {
    pub material_id: i64,
    pub material_name: String,
    pub unit: String,
    pub required: f64,
    pub available: f64,
    pub deficit: f64,
    pub sufficient: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub items: Vec<AvailabilityItem>,
}

impl AvailabilityReport {
    pub fn shortages(&self) -> impl Iterator<Item = &AvailabilityItem> {
        self.items.iter().filter(|i| !i.sufficient)
    }
}

/// 在制订单的分析输入
pub struct ActiveOrderDemand<'a> {
    pub order: &'a ProductionOrder,
    pub chain: &'a [StageTemplate],
    pub tasks: &'a [ProductionTask],
}

pub struct AvailabilityAnalyzer;

impl AvailabilityAnalyzer {
    /// 计算齐套报告（物料ID升序，全部物料都出现）
    pub fn analyze(materials: &[Material], demands: &[ActiveOrderDemand<'_>]) -> AvailabilityReport {
        let mut required: BTreeMap<i64, f64> = BTreeMap::new();

        for demand in demands {
            if !demand.order.status.is_active() {
                continue;
            }
            let done: HashSet<&str> = demand
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Done)
                .map(|t| t.stage_name.as_str())
                .collect();

            for stage in demand.chain {
                if done.contains(stage.name.as_str()) {
                    continue;
                }
                for req in &stage.requirements {
                    *required.entry(req.material_id).or_insert(0.0) +=
                        req.quantity_needed * demand.order.quantity as f64;
                }
            }
        }

        let mut sorted: Vec<&Material> = materials.iter().collect();
        sorted.sort_by_key(|m| m.id);

        let items = sorted
            .into_iter()
            .map(|m| {
                let req = required.get(&m.id).copied().unwrap_or(0.0);
                let sufficient = stock_covers(m.quantity_in_stock, req);
                AvailabilityItem {
                    material_id: m.id,
                    material_name: m.name.clone(),
                    unit: m.unit.clone(),
                    required: req,
                    available: m.quantity_in_stock,
                    deficit: if sufficient { 0.0 } else { req - m.quantity_in_stock },
                    sufficient,
                }
            })
            .collect();

        AvailabilityReport { items }
    }
}
