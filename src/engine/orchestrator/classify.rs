// ==========================================
// 冲减编排器 - 需求类型划分
// ==========================================
// 订单按原始坐标输出 (聚合粒度输出时按冲减坐标)
// 聚合模式下预测伪订单按原始预测行冲减后剩余量比例拆回原始坐标
// ==========================================

use super::context::{NettingContext, NettingState};
use crate::domain::output::DemandTypeRow;
use crate::engine::classifier::DemandTypeClassifier;
use crate::engine::workspace::{DemandOrigin, QUANTITY_EPSILON};
use chrono::NaiveDate;
use tracing::info;

/// 划分结果：订单行带交期（画像使用）
#[derive(Debug, Default)]
pub(crate) struct ClassifiedRows {
    pub orders: Vec<(DemandTypeRow, Option<NaiveDate>)>,
    pub forecasts: Vec<DemandTypeRow>,
}

pub(crate) fn classify(ctx: &NettingContext<'_>, state: &NettingState) -> ClassifiedRows {
    let classifier = DemandTypeClassifier::new(ctx.config.split_demand_types);
    let at_aggregate = ctx.output_at_aggregate_grain();
    let disaggregate = ctx.lifter.is_some() && !at_aggregate;

    let mut result = ClassifiedRows::default();
    for row in &state.demands {
        match row.origin {
            DemandOrigin::Order { .. } => {
                let rows = classifier.classify_order(row, &ctx.streams, |r| {
                    if at_aggregate {
                        r.netting.clone()
                    } else {
                        r.native.clone()
                    }
                });
                result.orders.extend(rows.into_iter().map(|r| (r, row.due_date)));
            }
            DemandOrigin::Forecast { stream, pool_row } => {
                let rows = classifier.classify_forecast(row, &ctx.streams, |r| r.native.clone());
                if disaggregate {
                    result.forecasts.extend(disaggregate_rows(state, stream, pool_row, rows));
                } else {
                    result.forecasts.extend(rows);
                }
            }
        }
    }

    info!(
        order_rows = result.orders.len(),
        forecast_rows = result.forecasts.len(),
        "需求类型划分完成"
    );
    result
}

/// 多流模式：过去订单整行使用订单流的过去订单标签
pub(crate) fn classify_past_orders(
    ctx: &NettingContext<'_>,
    state: &NettingState,
) -> Vec<(DemandTypeRow, Option<NaiveDate>)> {
    let classifier = DemandTypeClassifier::new(ctx.config.split_demand_types);
    let rows: Vec<(DemandTypeRow, Option<NaiveDate>)> = state
        .past_orders
        .iter()
        .flat_map(|row| {
            classifier
                .classify_past_order(row, &ctx.streams)
                .into_iter()
                .map(move |r| (r, row.due_date))
        })
        .collect();
    info!(past_orders = state.past_orders.len(), rows = rows.len(), "过去订单已拆出");
    rows
}

/// 聚合预测行的需求类型 → 原始预测坐标
///
/// 权重依次取: 原始粒度冲减后的伪订单数量、可计划数量、均分
fn disaggregate_rows(
    state: &NettingState,
    stream: usize,
    pool_row: usize,
    rows: Vec<DemandTypeRow>,
) -> Vec<DemandTypeRow> {
    let Some(native) = state.native_pool.as_ref() else {
        return rows;
    };
    let Some(members) = state.pool.members.get(pool_row) else {
        return rows;
    };

    let mut targets: Vec<usize> = members
        .iter()
        .filter_map(|&m| state.forecasts.get(m))
        .filter_map(|f| native.index.get(&f.coord))
        .collect();
    targets.sort_unstable();
    targets.dedup();
    if targets.is_empty() {
        return rows;
    }

    let mut weights: Vec<f64> = targets.iter().map(|&n| native.pseudo_quantity(stream, n)).collect();
    if weights.iter().sum::<f64>() <= QUANTITY_EPSILON {
        weights = targets.iter().map(|&n| native.planning[stream][n]).collect();
    }
    if weights.iter().sum::<f64>() <= QUANTITY_EPSILON {
        weights = vec![1.0; targets.len()];
    }
    let total: f64 = weights.iter().sum();

    let mut out = Vec::with_capacity(rows.len() * targets.len());
    for row in rows {
        for (&n, weight) in targets.iter().zip(&weights) {
            let quantity = row.quantity * weight / total;
            if quantity <= QUANTITY_EPSILON {
                continue;
            }
            let coord = &native.rows[n].coord;
            out.push(DemandTypeRow {
                item: coord.item.clone(),
                location: coord.location.clone(),
                customer: coord.customer.clone(),
                time: coord.time.clone(),
                quantity,
                ..row.clone()
            });
        }
    }
    out
}
