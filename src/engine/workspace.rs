// ==========================================
// 需求冲减引擎 - 冲减工作区
// ==========================================
// 职责: 以稳定下标保存需求行 (订单/伪订单) 与供应池 (预测/RTF)
// 约定: 每轮冲减只借用剩余量,结束后按差额写回
// ==========================================

use crate::domain::records::{BucketParams, Coord, ForecastRecord, OrderRecord, SupplyRecord};
use crate::engine::ledger::SupplyIndex;
use crate::engine::stream::StreamManager;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// 数量比较容差
pub const QUANTITY_EPSILON: f64 = 1e-9;

// ==========================================
// 需求行
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandOrigin {
    Order { stream: usize },                    // 订单流下标
    Forecast { stream: usize, pool_row: usize }, // 未消耗预测转成的伪订单
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandRow {
    // ===== 标识 =====
    pub version: String,
    pub demand_id: String,
    pub native: Coord,  // 原始粒度坐标（输出用）
    pub netting: Coord, // 冲减粒度坐标（生成候选用）
    pub origin: DemandOrigin,

    // ===== 数量与排序 =====
    pub open_quantity: f64,
    pub priority: Option<f64>,
    pub time_priority: f64,

    // ===== 冲减参数 =====
    pub params: BucketParams,
    pub exclude_netting: bool,
    pub exclude_planning: bool,
    pub rtf_eligible: bool,
    pub due_date: Option<NaiveDate>,

    // ===== 冲减状态 =====
    pub remaining: f64,              // 预测冲减后的剩余
    pub consumed_by_stream: Vec<f64>, // 各预测流消耗量
    pub covered_by_rtf: f64,
}

impl DemandRow {
    /// 由订单记录创建
    pub fn from_order(
        order: &OrderRecord,
        stream: usize,
        netting: Coord,
        stream_count: usize,
        rtf_eligible: bool,
    ) -> Self {
        Self {
            version: order.version.clone(),
            demand_id: order.demand_id.clone(),
            native: order.coord.clone(),
            netting,
            origin: DemandOrigin::Order { stream },
            open_quantity: order.open_quantity,
            priority: order.priority,
            time_priority: 0.0,
            params: order.params,
            exclude_netting: order.exclude_netting,
            exclude_planning: order.exclude_planning,
            rtf_eligible,
            due_date: order.due_date,
            remaining: order.open_quantity.max(0.0),
            consumed_by_stream: vec![0.0; stream_count],
            covered_by_rtf: 0.0,
        }
    }

    pub fn is_pseudo(&self) -> bool {
        matches!(self.origin, DemandOrigin::Forecast { .. })
    }

    /// 全部预测流累计消耗
    pub fn consumed_by_all_forecast(&self) -> f64 {
        self.consumed_by_stream.iter().sum()
    }

    /// 预测冲减后的剩余（负数截为 0）
    pub fn remaining_after_forecast(&self) -> f64 {
        (self.open_quantity - self.consumed_by_all_forecast()).max(0.0)
    }

    pub fn not_covered_by_rtf(&self) -> f64 {
        (self.open_quantity - self.covered_by_rtf).max(0.0)
    }

    /// 日志中标识该行
    pub fn label(&self) -> String {
        format!(
            "{}@{}/{}/{}/{}",
            self.demand_id, self.native.item, self.native.location, self.native.customer, self.native.time
        )
    }
}

// ==========================================
// 预测供应池
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct PoolRow {
    pub version: String,
    pub coord: Coord,
    pub params: BucketParams,
    pub exclude_netting: bool,
    pub exclude_planning: bool,
}

/// 按 [预测流][行] 保存数量
#[derive(Debug, Clone, Default)]
pub struct ForecastPool {
    pub rows: Vec<PoolRow>,
    pub index: SupplyIndex,
    pub measure: Vec<Vec<f64>>,   // 原始数量
    pub netting: Vec<Vec<f64>>,   // 可参与冲减的数量
    pub planning: Vec<Vec<f64>>,  // 可参与计划的数量
    pub remaining: Vec<Vec<f64>>, // 冲减后剩余
    pub members: Vec<Vec<usize>>, // 组成该行的原始预测下标
}

impl ForecastPool {
    /// 按坐标汇总预测记录
    ///
    /// # 参数
    /// - key: 预测记录 → 池坐标（原始粒度或聚合粒度）
    /// - aggregate: 聚合时窗口取均值、向上层级置 0、排除标志按数量体现
    pub fn build<F>(forecasts: &[ForecastRecord], streams: &StreamManager, key: F, aggregate: bool) -> Self
    where
        F: Fn(&ForecastRecord) -> Coord,
    {
        let stream_count = streams.forecast_streams().len();
        let mut groups: BTreeMap<Coord, Vec<usize>> = BTreeMap::new();
        for (i, record) in forecasts.iter().enumerate() {
            groups.entry(key(record)).or_default().push(i);
        }

        let mut pool = ForecastPool {
            measure: vec![Vec::with_capacity(groups.len()); stream_count],
            netting: vec![Vec::with_capacity(groups.len()); stream_count],
            planning: vec![Vec::with_capacity(groups.len()); stream_count],
            ..Default::default()
        };

        for (coord, members) in groups {
            let first = &forecasts[members[0]];
            let params = if aggregate {
                let n = members.len();
                let backward = members.iter().map(|&m| forecasts[m].params.backward).sum::<usize>() / n;
                let forward = members.iter().map(|&m| forecasts[m].params.forward).sum::<usize>() / n;
                BucketParams {
                    backward,
                    forward,
                    upward: Default::default(),
                }
            } else {
                first.params
            };

            for (s, fs) in streams.forecast_streams().iter().enumerate() {
                let mut measure = 0.0;
                let mut netting = 0.0;
                let mut planning = 0.0;
                for &m in &members {
                    let record = &forecasts[m];
                    let value = record.measure(&fs.measure).max(0.0);
                    measure += value;
                    if !record.exclude_netting {
                        netting += value;
                    }
                    if !record.exclude_planning {
                        planning += value;
                    }
                }
                pool.measure[s].push(measure);
                pool.netting[s].push(netting);
                pool.planning[s].push(planning);
            }

            pool.rows.push(PoolRow {
                version: first.version.clone(),
                coord,
                params,
                exclude_netting: !aggregate && first.exclude_netting,
                exclude_planning: !aggregate && first.exclude_planning,
            });
            pool.members.push(members);
        }

        pool.remaining = pool.netting.clone();
        pool.index = SupplyIndex::build(pool.rows.iter().map(|r| &r.coord));
        pool
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 已被订单消耗的数量
    pub fn consumed(&self, stream: usize, row: usize) -> f64 {
        (self.netting[stream][row] - self.remaining[stream][row]).max(0.0)
    }

    /// 转成伪订单的数量：min(原始 − 已消耗, 可计划数量)
    pub fn pseudo_quantity(&self, stream: usize, row: usize) -> f64 {
        let unconsumed = self.measure[stream][row] - self.consumed(stream, row);
        unconsumed.min(self.planning[stream][row]).max(0.0)
    }
}

// ==========================================
// RTF 供应池
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SupplyPool {
    pub rows: Vec<SupplyRecord>,
    pub index: SupplyIndex,
}

impl SupplyPool {
    /// 按坐标汇总 RTF（按坐标排序，即时间桶在组内升序）
    pub fn build<F>(supply: &[SupplyRecord], key: F) -> Self
    where
        F: Fn(&SupplyRecord) -> Coord,
    {
        let mut grouped: BTreeMap<Coord, SupplyRecord> = BTreeMap::new();
        for record in supply {
            let coord = key(record);
            grouped
                .entry(coord.clone())
                .and_modify(|r| r.quantity += record.quantity.max(0.0))
                .or_insert_with(|| SupplyRecord {
                    version: record.version.clone(),
                    coord,
                    quantity: record.quantity.max(0.0),
                });
        }
        let rows: Vec<SupplyRecord> = grouped.into_values().collect();
        let index = SupplyIndex::build(rows.iter().map(|r| &r.coord));
        Self { rows, index }
    }

    pub fn quantities(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.quantity).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NettingConfig;

    fn forecast(item: &str, time: &str, qty: f64, exclude_netting: bool) -> ForecastRecord {
        let mut measures = BTreeMap::new();
        measures.insert("Base Forecast Quantity".to_string(), qty);
        ForecastRecord {
            version: "CW".to_string(),
            coord: Coord::new(item, "L1", "C1", time),
            params: BucketParams::default(),
            exclude_netting,
            exclude_planning: false,
            measures,
        }
    }

    #[test]
    fn test_pool_sums_duplicates_and_tracks_netting_share() {
        let streams = StreamManager::single_stream(&NettingConfig::default());
        let forecasts = vec![
            forecast("A", "W1", 10.0, false),
            forecast("A", "W1", 4.0, true),
            forecast("B", "W1", 3.0, false),
        ];
        let pool = ForecastPool::build(&forecasts, &streams, |f| f.coord.clone(), false);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.measure[0][0], 14.0);
        assert_eq!(pool.netting[0][0], 10.0);
        assert_eq!(pool.members[0], vec![0, 1]);
        assert_eq!(pool.pseudo_quantity(0, 0), 14.0);
    }

    #[test]
    fn test_pseudo_quantity_after_consumption() {
        let streams = StreamManager::single_stream(&NettingConfig::default());
        let forecasts = vec![forecast("A", "W1", 10.0, false)];
        let mut pool = ForecastPool::build(&forecasts, &streams, |f| f.coord.clone(), false);
        pool.remaining[0][0] = 3.0;
        assert_eq!(pool.consumed(0, 0), 7.0);
        assert_eq!(pool.pseudo_quantity(0, 0), 3.0);
    }

    #[test]
    fn test_supply_pool_groups_by_coord() {
        let supply = vec![
            SupplyRecord { version: "CW".into(), coord: Coord::new("A", "L", "C", "W2"), quantity: 5.0 },
            SupplyRecord { version: "CW".into(), coord: Coord::new("A", "L", "C", "W1"), quantity: 2.0 },
            SupplyRecord { version: "CW".into(), coord: Coord::new("A", "L", "C", "W2"), quantity: 1.0 },
        ];
        let pool = SupplyPool::build(&supply, |s| s.coord.clone());
        assert_eq!(pool.quantities(), vec![2.0, 6.0]);
        assert_eq!(pool.index.get(&Coord::new("A", "L", "C", "W2")), Some(1));
    }
}
