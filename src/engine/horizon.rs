// ==========================================
// 需求冲减引擎 - 展望期拆分 (Horizon Splitter)
// ==========================================
// 职责: 按参考日期拆出不参与冲减的订单/预测
// - Skip 模式或展望期为 0: 全部跳过
// - 展望期 > 0: 截止日 = 参考日 + (展望期 − 1) 个粒度单位
// - 多流模式: 早于参考日的订单为过去订单
// 跳过的行直接输出为 "Orders" / "Forecast"
// ==========================================

use crate::config::NettingConfig;
use crate::domain::output::DemandTypeRow;
use crate::domain::records::{ForecastRecord, OrderRecord};
use crate::domain::types::{demand_types, TimeGrain};
use crate::engine::stream::StreamManager;
use chrono::NaiveDate;
use tracing::{debug, warn};

/// 拆分结果
#[derive(Debug, Clone, Default)]
pub struct HorizonSplit {
    pub orders: Vec<OrderRecord>,
    pub forecasts: Vec<ForecastRecord>,
    pub skipped_orders: Vec<OrderRecord>,
    pub skipped_forecasts: Vec<ForecastRecord>,
}

impl HorizonSplit {
    /// 没有需要冲减的行
    pub fn nothing_to_net(&self) -> bool {
        self.orders.is_empty() && self.forecasts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonSplitter {
    skip_all: bool,
    cutoff: Option<NaiveDate>,
}

impl HorizonSplitter {
    /// 根据配置与参考日期确定截止日
    pub fn new(config: &NettingConfig, reference_date: Option<NaiveDate>) -> Self {
        let skip_all = config.skip_netting || config.order_horizon == 0;
        let cutoff = if skip_all || config.order_horizon < 0 {
            None
        } else {
            match reference_date {
                Some(reference) => {
                    let units = (config.order_horizon - 1).clamp(0, u32::MAX as i64) as u32;
                    horizon_cutoff(reference, config.horizon_grain, units)
                }
                None => {
                    warn!(horizon = config.order_horizon, "缺少参考日期，忽略订单展望期");
                    None
                }
            }
        };
        Self { skip_all, cutoff }
    }

    pub fn skip_all(&self) -> bool {
        self.skip_all
    }

    pub fn cutoff(&self) -> Option<NaiveDate> {
        self.cutoff
    }

    /// 拆分订单与预测
    ///
    /// # 参数
    /// - date_of: 时间桶 → 起始日期（无法解析的桶从不超出展望期）
    pub fn split<F>(&self, orders: Vec<OrderRecord>, forecasts: Vec<ForecastRecord>, date_of: F) -> HorizonSplit
    where
        F: Fn(&str) -> Option<NaiveDate>,
    {
        if self.skip_all {
            return HorizonSplit {
                skipped_orders: orders,
                skipped_forecasts: forecasts,
                ..Default::default()
            };
        }
        let Some(cutoff) = self.cutoff else {
            return HorizonSplit {
                orders,
                forecasts,
                ..Default::default()
            };
        };

        let beyond = |time: &str| date_of(time).map(|d| d > cutoff).unwrap_or(false);
        let (skipped_orders, orders): (Vec<_>, Vec<_>) =
            orders.into_iter().partition(|o| beyond(&o.coord.time));
        let (skipped_forecasts, forecasts): (Vec<_>, Vec<_>) =
            forecasts.into_iter().partition(|f| beyond(&f.coord.time));

        debug!(
            cutoff = %cutoff,
            skipped_orders = skipped_orders.len(),
            skipped_forecasts = skipped_forecasts.len(),
            "展望期拆分完成"
        );
        HorizonSplit {
            orders,
            forecasts,
            skipped_orders,
            skipped_forecasts,
        }
    }
}

fn horizon_cutoff(reference: NaiveDate, grain: TimeGrain, units: u32) -> Option<NaiveDate> {
    let cutoff = grain.add_units(reference, units);
    if cutoff.is_none() {
        warn!(reference = %reference, units, "展望期截止日超出日期范围，忽略订单展望期");
    }
    cutoff
}

// ==========================================
// 跳过行 → 需求类型行
// ==========================================

/// 跳过的订单：按未结数量输出为 "Orders"
pub fn skipped_order_rows(orders: &[OrderRecord]) -> Vec<DemandTypeRow> {
    orders
        .iter()
        .filter(|o| o.open_quantity >= 0.0)
        .map(|o| DemandTypeRow {
            version: o.version.clone(),
            item: o.coord.item.clone(),
            location: o.coord.location.clone(),
            customer: o.coord.customer.clone(),
            time: o.coord.time.clone(),
            demand_id: o.demand_id.clone(),
            demand_type: demand_types::SKIPPED_ORDERS.to_string(),
            quantity: o.open_quantity,
        })
        .collect()
}

/// 跳过的预测：每个预测流数量 > 0 时输出一行 "Forecast"
pub fn skipped_forecast_rows(forecasts: &[ForecastRecord], streams: &StreamManager) -> Vec<DemandTypeRow> {
    let mut rows = Vec::new();
    for fs in streams.forecast_streams() {
        for f in forecasts {
            let quantity = f.measure(&fs.measure);
            if quantity <= 0.0 {
                continue;
            }
            rows.push(DemandTypeRow {
                version: f.version.clone(),
                item: f.coord.item.clone(),
                location: f.coord.location.clone(),
                customer: f.coord.customer.clone(),
                time: f.coord.time.clone(),
                demand_id: fs.demand_id.clone(),
                demand_type: demand_types::SKIPPED_FORECAST.to_string(),
                quantity,
            });
        }
    }
    rows
}

// ==========================================
// 过去订单（多流模式）
// ==========================================

/// 拆出时间桶早于参考日期的订单
///
/// # 返回
/// (需冲减订单, 过去订单)
pub fn split_past_orders<F>(
    orders: Vec<OrderRecord>,
    reference_date: Option<NaiveDate>,
    date_of: F,
) -> (Vec<OrderRecord>, Vec<OrderRecord>)
where
    F: Fn(&str) -> Option<NaiveDate>,
{
    let Some(reference) = reference_date else {
        warn!("缺少参考日期，不拆分过去订单");
        return (orders, Vec::new());
    };
    let (past, current): (Vec<_>, Vec<_>) = orders
        .into_iter()
        .partition(|o| date_of(&o.coord.time).map(|d| d < reference).unwrap_or(false));
    (current, past)
}
