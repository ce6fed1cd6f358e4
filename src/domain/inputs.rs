// ==========================================
// 需求冲减引擎 - 一次运行的全部输入
// ==========================================
// 由导入层读出、由 SchemaBinder 绑定为强类型记录
// ==========================================

use crate::domain::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NettingInputs {
    // ===== 需求与供应 =====
    pub orders: Table,
    pub forecasts: Table,
    pub supply: Table, // RTF

    // ===== 维度层级表（列顺序: 叶子 → 根）=====
    pub item_hierarchy: Table,
    pub location_hierarchy: Table,
    pub customer_hierarchy: Table,
    pub time_hierarchy: Table,

    // ===== 画像 =====
    pub telescopic: Table,
    pub basis: Table,

    // ===== 可选模式 =====
    pub association_graph: Table,
    pub order_streams: Table,
    pub forecast_streams: Table,
    pub reference_date: Table, // 当前/过去订单参考日期，取第一行

    // ===== 参数 =====
    pub parameters: HashMap<String, String>,
}
