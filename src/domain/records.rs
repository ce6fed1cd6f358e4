// ==========================================
// 需求冲减引擎 - 冲减记录
// ==========================================
// 订单 / 预测 / RTF 的强类型记录,由 SchemaBinder 从原始表绑定而来
// ==========================================

use crate::domain::types::Dimension;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// 坐标 (item, location, customer, time)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub item: String,
    pub location: String,
    pub customer: String,
    pub time: String,
}

impl Coord {
    pub fn new(
        item: impl Into<String>,
        location: impl Into<String>,
        customer: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            item: item.into(),
            location: location.into(),
            customer: customer.into(),
            time: time.into(),
        }
    }

    /// 替换时间桶
    pub fn at_time(&self, time: &str) -> Self {
        Self {
            time: time.to_string(),
            ..self.clone()
        }
    }

    /// 按维度读取坐标值
    pub fn value(&self, dim: Dimension) -> &str {
        match dim {
            Dimension::Item => &self.item,
            Dimension::Location => &self.location,
            Dimension::Customer => &self.customer,
            Dimension::Time => &self.time,
        }
    }

    /// 不含时间的三元组
    pub fn grain(&self) -> (String, String, String) {
        (
            self.item.clone(),
            self.location.clone(),
            self.customer.clone(),
        )
    }
}

// ==========================================
// 向上层级 (Upward Levels)
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpwardLevels {
    pub item: usize,
    pub location: usize,
    pub customer: usize,
    pub time: usize,
}

impl UpwardLevels {
    pub fn is_zero(&self) -> bool {
        self.item == 0 && self.location == 0 && self.customer == 0 && self.time == 0
    }
}

// ==========================================
// 冲减窗口参数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketParams {
    pub backward: usize, // 向前(过去)桶数
    pub forward: usize,  // 向后(未来)桶数
    pub upward: UpwardLevels,
}

// ==========================================
// 订单记录 (Demand Record)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    // ===== 主键 =====
    pub version: String,
    pub demand_id: String,
    pub coord: Coord,

    // ===== 数量 =====
    pub quantity: f64,
    pub open_quantity: f64, // 缺省等于 quantity
    pub priority: Option<f64>,

    // ===== 冲减参数 =====
    pub params: BucketParams,
    pub exclude_netting: bool,
    pub exclude_planning: bool,

    // ===== 其他属性 =====
    pub order_type: String, // 订单流
    pub due_date: Option<NaiveDate>,
}

// ==========================================
// 预测记录 (Supply-side Record)
// ==========================================
// measures 保存所有数值列，按预测流名称读取
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub version: String,
    pub coord: Coord,
    pub params: BucketParams,
    pub exclude_netting: bool,
    pub exclude_planning: bool,
    pub measures: BTreeMap<String, f64>,
}

impl ForecastRecord {
    /// 读取度量值，缺失视为 0
    pub fn measure(&self, name: &str) -> f64 {
        self.measures.get(name).copied().unwrap_or(0.0)
    }
}

// ==========================================
// RTF 供应记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub version: String,
    pub coord: Coord,
    pub quantity: f64,
}

// ==========================================
// 订单-预测关联图的边
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationEdge {
    pub from_item: String,
    pub from_location: String,
    pub from_customer: String,
    pub to_item: String,
    pub to_location: String,
    pub to_customer: String,
    pub priority: f64,
    pub forecast_association: bool,
    pub rtf_association: bool,
}
