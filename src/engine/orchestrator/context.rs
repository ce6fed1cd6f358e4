// ==========================================
// 冲减编排器 - 预处理上下文
// ==========================================
// NettingContext: 一次运行内只读的结构 (流描述、时间桶、层级、聚合映射、关联图)
// NettingState:   各轮冲减依次修改的工作区 (需求行、预测池、RTF 池、pegging)
// ==========================================

use crate::config::NettingConfig;
use crate::domain::inputs::NettingInputs;
use crate::domain::output::PeggingRow;
use crate::domain::records::{AssociationEdge, Coord, ForecastRecord, OrderRecord, SupplyRecord};
use crate::domain::table::Table;
use crate::domain::types::Dimension;
use crate::engine::aggregate::AggregateLifter;
use crate::engine::bucket_resolver::{parse_date, BucketResolver};
use crate::engine::graph::AssociationGraph;
use crate::engine::hierarchy::{HierarchyIndex, HierarchySet};
use crate::engine::horizon::split_past_orders;
use crate::engine::stream::StreamManager;
use crate::engine::workspace::{DemandRow, ForecastPool, SupplyPool};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

// ==========================================
// 时间日历：时间桶 → 起始日期
// ==========================================
#[derive(Debug, Clone, Default)]
pub(crate) struct TimeCalendar {
    start_dates: HashMap<String, NaiveDate>,
}

impl TimeCalendar {
    /// 从伸缩时间表取每个冲减时间桶最早的一天
    pub(crate) fn from_telescopic(table: &Table, time_column: &str, day_column: &str) -> Self {
        let mut start_dates: HashMap<String, NaiveDate> = HashMap::new();
        let (Some(time_col), Some(day_col)) = (table.column_index(time_column), table.column_index(day_column))
        else {
            return Self { start_dates };
        };
        for row in 0..table.len() {
            let bucket = table.cell(row, time_col);
            let Some(day) = parse_date(table.cell(row, day_col)) else {
                continue;
            };
            if bucket.is_empty() {
                continue;
            }
            start_dates
                .entry(bucket.to_string())
                .and_modify(|d| *d = (*d).min(day))
                .or_insert(day);
        }
        debug!(buckets = start_dates.len(), "时间桶起始日期构建完成");
        Self { start_dates }
    }

    /// 时间桶日期：桶名本身是日期时直接解析，否则查伸缩表
    pub(crate) fn date_of(&self, bucket: &str) -> Option<NaiveDate> {
        parse_date(bucket).or_else(|| self.start_dates.get(bucket).copied())
    }

    pub(crate) fn start_dates(&self) -> &HashMap<String, NaiveDate> {
        &self.start_dates
    }
}

// ==========================================
// 只读上下文
// ==========================================
pub(crate) struct NettingContext<'a> {
    pub config: &'a NettingConfig,
    pub streams: StreamManager,
    pub buckets: BucketResolver,
    pub hierarchies: HierarchySet,
    pub lifter: Option<AggregateLifter>, // Some: 聚合冲减
    pub graph: Option<AssociationGraph>, // Some: 关联图冲减
}

impl NettingContext<'_> {
    /// 原始坐标 → 冲减坐标
    pub(crate) fn lift(&self, coord: &Coord) -> Coord {
        lift_with(self.lifter.as_ref(), coord)
    }

    /// 结果是否保持在聚合粒度输出
    pub(crate) fn output_at_aggregate_grain(&self) -> bool {
        self.lifter.is_some() && self.config.output_at_aggregate_grain
    }
}

// ==========================================
// 可变工作区
// ==========================================
#[derive(Debug, Default)]
pub(crate) struct NettingState {
    pub demands: Vec<DemandRow>,
    pub past_orders: Vec<DemandRow>,       // 多流模式下的过去订单，不参与冲减
    pub forecasts: Vec<ForecastRecord>,    // 参与冲减的预测记录（池成员下标指向这里）
    pub pool: ForecastPool,                // 冲减粒度预测池
    pub native_pool: Option<ForecastPool>, // 聚合模式下的原始粒度预测池
    pub supply: SupplyPool,
    pub pegging: Vec<PeggingRow>,
}

/// 预处理输入（已通过展望期拆分）
pub(crate) struct PreprocessInput<'i> {
    pub orders: Vec<OrderRecord>,
    pub forecasts: Vec<ForecastRecord>,
    pub supply: &'i [SupplyRecord],
    pub association_edges: &'i [AssociationEdge],
    pub reference_date: Option<NaiveDate>,
}

/// 构建上下文与工作区
///
/// # 说明
/// - 关联图模式优先于聚合与多流模式
/// - 多流模式下拆出过去订单，订单流不存在的订单丢弃（汇总告警）
/// - 层级只保留需求/供应中出现过的值，兄弟范围限定为供应侧的值
pub(crate) fn build_context<'a>(
    config: &'a NettingConfig,
    inputs: &NettingInputs,
    streams: StreamManager,
    calendar: &TimeCalendar,
    input: PreprocessInput<'_>,
) -> (NettingContext<'a>, NettingState) {
    let graph_mode = config.use_mapping_graph;

    // ===== 聚合映射 =====
    let lifter = if config.use_aggregate && graph_mode {
        warn!("关联图模式优先，忽略聚合冲减");
        None
    } else if config.use_aggregate {
        let lifter = AggregateLifter::build(
            config,
            [
                &inputs.item_hierarchy,
                &inputs.location_hierarchy,
                &inputs.customer_hierarchy,
                &inputs.time_hierarchy,
            ],
        );
        if lifter.is_active() {
            Some(lifter)
        } else {
            warn!(levels = ?config.aggregate_levels, "没有可用的聚合层级，按原始粒度冲减");
            None
        }
    } else {
        None
    };

    // ===== 过去订单与订单流归属 =====
    let (orders, past) = if streams.is_multi_stream() {
        split_past_orders(input.orders, input.reference_date, |t| calendar.date_of(t))
    } else {
        (input.orders, Vec::new())
    };

    let stream_count = streams.forecast_streams().len();
    let mut unknown_streams: HashSet<String> = HashSet::new();
    let mut to_rows = |orders: Vec<OrderRecord>| -> Vec<DemandRow> {
        orders
            .into_iter()
            .filter_map(|order| {
                let Some(stream) = streams.stream_of(&order.order_type) else {
                    unknown_streams.insert(order.order_type.clone());
                    return None;
                };
                let rtf_eligible = streams.order_stream(stream).map(|d| d.rtf_eligible()).unwrap_or(true);
                let netting = lift_with(lifter.as_ref(), &order.coord);
                Some(DemandRow::from_order(&order, stream, netting, stream_count, rtf_eligible))
            })
            .collect()
    };
    let mut demands = to_rows(orders);
    let past_orders = to_rows(past);
    if !unknown_streams.is_empty() {
        let mut names: Vec<String> = unknown_streams.into_iter().collect();
        names.sort();
        warn!(order_types = ?names, "订单类型没有对应的订单流，相关订单不参与冲减");
    }

    // ===== 供应池 =====
    let aggregate = lifter.is_some();
    let pool = ForecastPool::build(&input.forecasts, &streams, |f| lift_with(lifter.as_ref(), &f.coord), aggregate);
    let native_pool = aggregate.then(|| ForecastPool::build(&input.forecasts, &streams, |f| f.coord.clone(), false));
    let supply = SupplyPool::build(input.supply, |s| lift_with(lifter.as_ref(), &s.coord));

    // ===== 时间桶 =====
    let buckets = build_buckets(config, inputs, lifter.as_ref(), calendar, &demands, &pool, &supply, &input.forecasts, input.supply);
    for row in demands.iter_mut() {
        row.time_priority = time_priority(&buckets, &row.netting.time);
    }

    // ===== 层级 =====
    let demand_coords: Vec<&Coord> = demands.iter().map(|d| &d.netting).collect();
    let supply_coords: Vec<&Coord> = pool.rows.iter().map(|r| &r.coord).chain(supply.rows.iter().map(|r| &r.coord)).collect();
    let hierarchies = build_hierarchies(config, inputs, lifter.as_ref(), &demand_coords, &supply_coords);

    // ===== 关联图 =====
    let graph = graph_mode.then(|| {
        let graph = AssociationGraph::build(input.association_edges);
        if graph.is_empty() {
            warn!("关联图为空，所有订单都找不到预测/RTF 候选");
        }
        graph
    });

    info!(
        demands = demands.len(),
        past_orders = past_orders.len(),
        forecast_rows = pool.len(),
        supply_rows = supply.len(),
        buckets = buckets.len(),
        aggregate,
        graph = graph_mode,
        multi_stream = streams.is_multi_stream(),
        "预处理完成"
    );

    let context = NettingContext {
        config,
        streams,
        buckets,
        hierarchies,
        lifter,
        graph,
    };
    let state = NettingState {
        demands,
        past_orders,
        forecasts: input.forecasts,
        pool,
        native_pool,
        supply,
        pegging: Vec::new(),
    };
    (context, state)
}

/// 时间优先级（桶序号），未知桶排在最前
pub(crate) fn time_priority(buckets: &BucketResolver, time: &str) -> f64 {
    buckets.position(time).map(|p| p as f64).unwrap_or(0.0)
}

fn lift_with(lifter: Option<&AggregateLifter>, coord: &Coord) -> Coord {
    match lifter {
        Some(lifter) => lifter.lift(coord),
        None => coord.clone(),
    }
}

/// 时间桶全集：需求/供应中出现的桶 + 时间层级表中的桶
#[allow(clippy::too_many_arguments)]
fn build_buckets(
    config: &NettingConfig,
    inputs: &NettingInputs,
    lifter: Option<&AggregateLifter>,
    calendar: &TimeCalendar,
    demands: &[DemandRow],
    pool: &ForecastPool,
    supply: &SupplyPool,
    forecasts: &[ForecastRecord],
    raw_supply: &[SupplyRecord],
) -> BucketResolver {
    let time_column = lifter
        .and_then(|l| l.aggregate_column(Dimension::Time))
        .unwrap_or(config.columns.time.as_str());

    let mut keys: Vec<&str> = demands.iter().map(|d| d.netting.time.as_str()).collect();
    keys.extend(pool.rows.iter().map(|r| r.coord.time.as_str()));
    keys.extend(supply.rows.iter().map(|r| r.coord.time.as_str()));
    keys.extend(inputs.time_hierarchy.column_values(time_column));

    // 聚合时间桶的起始日期 = 所含原始桶的最早日期
    let start_dates = match lifter.filter(|l| l.aggregate_column(Dimension::Time).is_some()) {
        Some(lifter) => {
            let mut lifted: HashMap<String, NaiveDate> = HashMap::new();
            let native_times = demands
                .iter()
                .map(|d| d.native.time.as_str())
                .chain(forecasts.iter().map(|f| f.coord.time.as_str()))
                .chain(raw_supply.iter().map(|s| s.coord.time.as_str()))
                .chain(calendar.start_dates().keys().map(String::as_str));
            for time in native_times {
                if let Some(date) = calendar.date_of(time) {
                    lifted
                        .entry(lifter.lift_time(time))
                        .and_modify(|d| *d = (*d).min(date))
                        .or_insert(date);
                }
            }
            lifted
        }
        None => calendar.start_dates().clone(),
    };

    BucketResolver::with_start_dates(keys, &start_dates).with_backward_before_current(config.backward_before_current)
}

fn build_hierarchies(
    config: &NettingConfig,
    inputs: &NettingInputs,
    lifter: Option<&AggregateLifter>,
    demand_coords: &[&Coord],
    supply_coords: &[&Coord],
) -> HierarchySet {
    let cols = &config.columns;
    let build = |dim: Dimension, table: &Table, leaf_column: &str| -> HierarchyIndex {
        let leaf_column = lifter.and_then(|l| l.aggregate_column(dim)).unwrap_or(leaf_column);
        let universe: HashSet<String> = supply_coords.iter().map(|c| c.value(dim).to_string()).collect();
        let mut observed: HashSet<String> = demand_coords.iter().map(|c| c.value(dim).to_string()).collect();
        observed.extend(universe.iter().cloned());
        HierarchyIndex::build(table, leaf_column, &observed, universe)
    };

    HierarchySet {
        item: build(Dimension::Item, &inputs.item_hierarchy, &cols.item),
        location: build(Dimension::Location, &inputs.location_hierarchy, &cols.location),
        customer: build(Dimension::Customer, &inputs.customer_hierarchy, &cols.customer),
        // 时间层级只在层级模式下使用
        time: if config.time_hierarchy {
            build(Dimension::Time, &inputs.time_hierarchy, &cols.time)
        } else {
            HierarchyIndex::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_takes_earliest_day() {
        let table = Table::from_rows(
            vec!["Week", "Partial Week", "Day"],
            vec![
                vec!["W2", "W2-a", "2024-01-09"],
                vec!["W2", "W2-a", "2024-01-08"],
                vec!["W1", "W1-a", "2024-01-01"],
            ],
        );
        let calendar = TimeCalendar::from_telescopic(&table, "Week", "Day");
        assert_eq!(calendar.date_of("W2"), NaiveDate::from_ymd_opt(2024, 1, 8));
        assert_eq!(calendar.date_of("2024-03-04"), NaiveDate::from_ymd_opt(2024, 3, 4));
        assert_eq!(calendar.date_of("W9"), None);
    }
}
