// ==========================================
// 需求冲减引擎 - 输出组装
// ==========================================
// 需求类型表: 同键求和,保留 4 位小数,按主键排序
// Pegging 表: 保持生成顺序,同一 (from, to) 组内序号从 1 递增
// ==========================================

use crate::domain::output::{DemandTypeKey, DemandTypeRow, PeggingRow};
use std::collections::{BTreeMap, HashMap};

/// 输出数量保留的小数位
pub const OUTPUT_DECIMALS: i32 = 4;

pub fn round_quantity(value: f64) -> f64 {
    let factor = 10f64.powi(OUTPUT_DECIMALS);
    let rounded = (value * factor).round() / factor;
    // 避免输出 -0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// 需求类型行：同键求和后取整，按主键排序
pub fn assemble_demand_types(rows: Vec<DemandTypeRow>) -> Vec<DemandTypeRow> {
    let mut grouped: BTreeMap<DemandTypeKey, f64> = BTreeMap::new();
    for row in rows {
        *grouped.entry(row.key()).or_insert(0.0) += row.quantity;
    }
    grouped
        .into_iter()
        .map(|((version, item, location, customer, time, demand_id, demand_type), quantity)| DemandTypeRow {
            version,
            item,
            location,
            customer,
            time,
            demand_id,
            demand_type,
            quantity: round_quantity(quantity),
        })
        .collect()
}

/// Pegging 行：分配组内序号并取整
pub fn assemble_pegging(rows: Vec<PeggingRow>) -> Vec<PeggingRow> {
    let mut counters: HashMap<[String; 9], u32> = HashMap::new();
    rows.into_iter()
        .map(|mut row| {
            let group = [
                row.from_demand_id.clone(),
                row.from_item.clone(),
                row.from_location.clone(),
                row.from_customer.clone(),
                row.from_time.clone(),
                row.to_item.clone(),
                row.to_location.clone(),
                row.to_customer.clone(),
                row.to_time.clone(),
            ];
            let counter = counters.entry(group).or_insert(0);
            *counter += 1;
            row.sequence = *counter;
            row.quantity = round_quantity(row.quantity);
            row
        })
        .collect()
}
