// ==========================================
// 需求冲减引擎 - 输出行
// ==========================================
// 需求类型表 (订单/预测) 与 Pegging 表
// 维度列在前,度量列在后
// ==========================================

use crate::domain::types::NettingStage;
use serde::{Deserialize, Serialize};

// ==========================================
// 需求类型行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandTypeRow {
    // ===== 维度 =====
    pub version: String,
    pub item: String,
    pub location: String,
    pub customer: String,
    pub time: String,
    pub demand_id: String,
    pub demand_type: String,

    // ===== 度量 =====
    pub quantity: f64,
}

/// 需求类型行主键
pub type DemandTypeKey = (String, String, String, String, String, String, String);

impl DemandTypeRow {
    pub fn key(&self) -> DemandTypeKey {
        (
            self.version.clone(),
            self.item.clone(),
            self.location.clone(),
            self.customer.clone(),
            self.time.clone(),
            self.demand_id.clone(),
            self.demand_type.clone(),
        )
    }
}

// ==========================================
// Pegging 行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeggingRow {
    // ===== FROM (需求) =====
    pub version: String,
    pub from_demand_id: String,
    pub from_item: String,
    pub from_location: String,
    pub from_customer: String,
    pub from_time: String,

    // ===== TO (供应) =====
    pub to_item: String,
    pub to_location: String,
    pub to_customer: String,
    pub to_time: String,

    // ===== 组内序号与度量 =====
    pub sequence: u32,
    pub measure: String,
    pub quantity: f64,
}

// ==========================================
// 一次冲减运行的完整输出
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NettingOutput {
    pub run_id: String,
    pub order_demand_types: Vec<DemandTypeRow>,
    pub forecast_demand_types: Vec<DemandTypeRow>,
    pub pegging: Vec<PeggingRow>,
    pub stages: Vec<NettingStage>, // 实际经过的状态序列
}

impl NettingOutput {
    /// 最终状态
    pub fn final_stage(&self) -> Option<NettingStage> {
        self.stages.last().copied()
    }
}
