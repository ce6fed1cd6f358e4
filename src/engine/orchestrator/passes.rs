// ==========================================
// 冲减编排器 - 冲减轮次
// ==========================================
// NATIVE_NET:   聚合模式下先按原始坐标 1:1 消耗基础预测
// FORECAST_NET: 订单流 × 预测流逐对冲减 (关联图模式下为 GRAPH_NET)
// COMBINE:      未消耗预测转成伪订单并入需求行
// RTF_NET:      全部需求行对 RTF 冲减
// 每轮: 建台账 → 按排序逐行 consume → 按差额写回
// ==========================================

use super::context::{time_priority, NettingContext, NettingState};
use crate::domain::output::PeggingRow;
use crate::domain::records::Coord;
use crate::engine::bucket_resolver::BucketResolver;
use crate::engine::error::NettingResult;
use crate::engine::graph::{AssociationGraph, AssociationKind};
use crate::engine::ledger::{AllocationLedger, PegEdge};
use crate::engine::priority::DemandPrioritySorter;
use crate::engine::tuple_generator::ConsumptionTupleGenerator;
use crate::engine::workspace::{DemandOrigin, DemandRow, QUANTITY_EPSILON};
use crate::perf::PerfGuard;
use tracing::{debug, info};

// ==========================================
// 候选来源：消耗元组生成器或关联图
// ==========================================
enum CandidateSource<'c> {
    Tuples(ConsumptionTupleGenerator<'c>),
    Graph(&'c AssociationGraph, AssociationKind),
}

impl<'c> CandidateSource<'c> {
    fn new(ctx: &'c NettingContext<'_>, kind: AssociationKind) -> NettingResult<Self> {
        match ctx.graph.as_ref() {
            Some(graph) => Ok(CandidateSource::Graph(graph, kind)),
            None => Ok(CandidateSource::Tuples(ConsumptionTupleGenerator::new(
                &ctx.hierarchies,
                &ctx.buckets,
                ctx.config,
            )?)),
        }
    }

    fn candidates(&mut self, row: &DemandRow, buckets: &BucketResolver) -> Vec<Coord> {
        match self {
            CandidateSource::Tuples(generator) => generator.generate(&row.netting, &row.params, &row.label()),
            CandidateSource::Graph(graph, kind) => graph.candidates(*kind, &row.netting, &row.params, buckets),
        }
    }

    fn finish(&self) {
        if let CandidateSource::Tuples(generator) = self {
            generator.finish();
        }
    }
}

/// 一轮冲减的汇总
#[derive(Debug, Default)]
struct PassOutcome {
    pegging: Vec<PegEdge>,
    consumed: f64,
    transfers: usize,
}

/// 对一个供应数组执行一轮冲减，并把差额写回需求行的剩余量与对应预测流的消耗量
fn net_against_pool<F>(
    demands: &mut [DemandRow],
    order: &[usize],
    supply_remaining: &mut Vec<f64>,
    stream: usize,
    pegging: bool,
    mut candidates_of: F,
) -> PassOutcome
where
    F: FnMut(&DemandRow) -> Vec<usize>,
{
    let demand_remaining = demands.iter().map(|d| d.remaining).collect();
    let mut ledger = AllocationLedger::new(demand_remaining, std::mem::take(supply_remaining), pegging);
    for &d in order {
        let candidates = candidates_of(&demands[d]);
        if !candidates.is_empty() {
            ledger.consume(d, &candidates);
        }
    }

    let outcome = ledger.into_outcome();
    let mut consumed_total = 0.0;
    for (row, &after) in demands.iter_mut().zip(&outcome.demand_remaining) {
        let consumed = row.remaining - after;
        if consumed > 0.0 {
            row.consumed_by_stream[stream] += consumed;
            row.remaining = after;
            consumed_total += consumed;
        }
    }
    *supply_remaining = outcome.supply_remaining;

    PassOutcome {
        pegging: outcome.pegging,
        consumed: consumed_total,
        transfers: outcome.transfers,
    }
}

/// 某订单流中参与预测冲减的行
fn netting_selection(demands: &[DemandRow], order_stream: usize) -> Vec<usize> {
    demands
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            matches!(row.origin, DemandOrigin::Order { stream } if stream == order_stream)
                && !row.exclude_netting
                && row.remaining > QUANTITY_EPSILON
        })
        .map(|(i, _)| i)
        .collect()
}

/// Pegging 边 → Pegging 行（FROM 取需求行原始坐标）
fn pegging_rows<'p, F>(demands: &[DemandRow], edges: &[PegEdge], supply_coord: F, measure: &str) -> Vec<PeggingRow>
where
    F: Fn(usize) -> &'p Coord,
{
    edges
        .iter()
        .map(|edge| {
            let demand = &demands[edge.demand];
            let to = supply_coord(edge.supply);
            PeggingRow {
                version: demand.version.clone(),
                from_demand_id: demand.demand_id.clone(),
                from_item: demand.native.item.clone(),
                from_location: demand.native.location.clone(),
                from_customer: demand.native.customer.clone(),
                from_time: demand.native.time.clone(),
                to_item: to.item.clone(),
                to_location: to.location.clone(),
                to_customer: to.customer.clone(),
                to_time: to.time.clone(),
                sequence: 0,
                measure: measure.to_string(),
                quantity: edge.quantity,
            }
        })
        .collect()
}

// ==========================================
// NATIVE_NET
// ==========================================

/// 聚合模式：订单先 1:1 消耗自身原始坐标上的基础预测，
/// 同时从对应聚合预测行扣减相同数量
pub(crate) fn native_net(ctx: &NettingContext<'_>, state: &mut NettingState) {
    let _perf = PerfGuard::new("native_net");
    let Some(native) = state.native_pool.as_mut() else {
        return;
    };
    let sorter = DemandPrioritySorter::new();
    let pegging = ctx.config.pegging;

    for (os, descriptor) in ctx.streams.order_streams().iter().enumerate() {
        for link in &descriptor.links {
            let fs = link.forecast_stream;
            let Some(forecast_stream) = ctx.streams.forecast_stream(fs).filter(|f| f.is_base) else {
                continue;
            };
            let selection = netting_selection(&state.demands, os);
            if selection.is_empty() {
                continue;
            }
            let order = sorter.sort_for_forecast(&state.demands, selection);

            let before = native.remaining[fs].clone();
            let index = &native.index;
            let outcome = net_against_pool(&mut state.demands, &order, &mut native.remaining[fs], fs, pegging, |row| {
                index.get(&row.native).into_iter().collect()
            });

            // 聚合预测行扣减相同数量
            for (r, used) in before.iter().zip(&native.remaining[fs]).map(|(b, a)| b - a).enumerate() {
                if used <= 0.0 {
                    continue;
                }
                if let Some(a) = state.pool.index.get(&ctx.lift(&native.rows[r].coord)) {
                    let remaining = &mut state.pool.remaining[fs][a];
                    *remaining = (*remaining - used).max(0.0);
                }
            }

            let native_rows = &native.rows;
            state.pegging.extend(pegging_rows(
                &state.demands,
                &outcome.pegging,
                move |s| &native_rows[s].coord,
                &forecast_stream.measure,
            ));
            info!(
                order_stream = %descriptor.name,
                forecast_stream = %forecast_stream.measure,
                rows = order.len(),
                consumed = outcome.consumed,
                transfers = outcome.transfers,
                "原始粒度冲减完成"
            );
        }
    }
}

// ==========================================
// FORECAST_NET / GRAPH_NET
// ==========================================

/// 订单流按消耗序号依次对各预测流冲减
pub(crate) fn forecast_net(ctx: &NettingContext<'_>, state: &mut NettingState) -> NettingResult<()> {
    let _perf = PerfGuard::new(if ctx.graph.is_some() { "graph_net" } else { "forecast_net" });
    let mut source = CandidateSource::new(ctx, AssociationKind::Forecast)?;
    let sorter = DemandPrioritySorter::new();
    let pegging = ctx.config.pegging;

    for (os, descriptor) in ctx.streams.order_streams().iter().enumerate() {
        for link in &descriptor.links {
            let fs = link.forecast_stream;
            let Some(forecast_stream) = ctx.streams.forecast_stream(fs) else {
                continue;
            };
            let selection = netting_selection(&state.demands, os);
            if selection.is_empty() {
                debug!(order_stream = %descriptor.name, forecast_stream = %forecast_stream.measure, "没有待冲减订单");
                continue;
            }
            let order = sorter.sort_for_forecast(&state.demands, selection);

            let pool = &mut state.pool;
            let index = &pool.index;
            let outcome = net_against_pool(&mut state.demands, &order, &mut pool.remaining[fs], fs, pegging, |row| {
                index.lookup(&source.candidates(row, &ctx.buckets))
            });

            let pool_rows = &state.pool.rows;
            state.pegging.extend(pegging_rows(
                &state.demands,
                &outcome.pegging,
                move |s| &pool_rows[s].coord,
                &forecast_stream.measure,
            ));
            info!(
                order_stream = %descriptor.name,
                forecast_stream = %forecast_stream.measure,
                rows = order.len(),
                consumed = outcome.consumed,
                transfers = outcome.transfers,
                "预测冲减完成"
            );
        }
    }
    source.finish();
    Ok(())
}

// ==========================================
// COMBINE
// ==========================================

/// 未消耗预测转成伪订单（继承预测行的冲减窗口参数）
///
/// # 返回
/// 新增伪订单行数
pub(crate) fn combine(ctx: &NettingContext<'_>, state: &mut NettingState) -> usize {
    let stream_count = ctx.streams.forecast_streams().len();
    let before = state.demands.len();

    for (s, forecast_stream) in ctx.streams.forecast_streams().iter().enumerate() {
        for (r, pool_row) in state.pool.rows.iter().enumerate() {
            let quantity = state.pool.pseudo_quantity(s, r);
            if quantity <= QUANTITY_EPSILON {
                continue;
            }
            state.demands.push(DemandRow {
                version: pool_row.version.clone(),
                demand_id: forecast_stream.demand_id.clone(),
                native: pool_row.coord.clone(),
                netting: pool_row.coord.clone(),
                origin: DemandOrigin::Forecast { stream: s, pool_row: r },
                open_quantity: quantity,
                priority: None,
                time_priority: time_priority(&ctx.buckets, &pool_row.coord.time),
                params: pool_row.params,
                exclude_netting: false,
                exclude_planning: false,
                rtf_eligible: forecast_stream.rtf_eligible,
                due_date: None,
                remaining: quantity,
                consumed_by_stream: vec![0.0; stream_count],
                covered_by_rtf: 0.0,
            });
        }
    }

    let added = state.demands.len() - before;
    info!(pseudo_orders = added, "未消耗预测已并入需求");
    added
}

// ==========================================
// RTF_NET
// ==========================================

/// 需求行（订单 + 伪订单）对 RTF 冲减；按未结数量整体参与
pub(crate) fn rtf_net(ctx: &NettingContext<'_>, state: &mut NettingState) -> NettingResult<()> {
    let _perf = PerfGuard::new("rtf_net");
    if state.supply.is_empty() {
        info!("RTF 为空，跳过 RTF 冲减");
        return Ok(());
    }
    let mut source = CandidateSource::new(ctx, AssociationKind::Rtf)?;
    let sorter = DemandPrioritySorter::new();

    let selection: Vec<usize> = state
        .demands
        .iter()
        .enumerate()
        .filter(|(_, row)| row.rtf_eligible && !row.exclude_planning && row.open_quantity > QUANTITY_EPSILON)
        .map(|(i, _)| i)
        .collect();
    if selection.is_empty() {
        info!("没有可参与 RTF 冲减的需求");
        return Ok(());
    }

    let max_time_priority = DemandPrioritySorter::max_time_priority(&state.demands, &selection);
    let offset = ctx
        .streams
        .pseudo_order_offset(max_time_priority, ctx.config.prioritize_by_time);
    let pseudo_ids = ctx.streams.default_demand_ids();
    let order = sorter.sort_for_rtf(&state.demands, selection, &pseudo_ids, offset);

    let demand_open = state.demands.iter().map(|d| d.open_quantity).collect();
    let mut ledger = AllocationLedger::new(demand_open, state.supply.quantities(), ctx.config.pegging);
    for &d in &order {
        let candidates = state
            .supply
            .index
            .lookup(&source.candidates(&state.demands[d], &ctx.buckets));
        if !candidates.is_empty() {
            ledger.consume(d, &candidates);
        }
    }
    source.finish();

    let outcome = ledger.into_outcome();
    let mut covered_total = 0.0;
    for (row, &after) in state.demands.iter_mut().zip(&outcome.demand_remaining) {
        row.covered_by_rtf = (row.open_quantity - after).max(0.0);
        covered_total += row.covered_by_rtf;
    }

    let supply_rows = &state.supply.rows;
    state.pegging.extend(pegging_rows(
        &state.demands,
        &outcome.pegging,
        move |s| &supply_rows[s].coord,
        &ctx.config.columns.rtf_quantity,
    ));
    info!(
        rows = order.len(),
        covered = covered_total,
        transfers = outcome.transfers,
        "RTF 冲减完成"
    );
    Ok(())
}
