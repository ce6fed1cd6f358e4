// ==========================================
// 需求冲减引擎 - 结构绑定 (Schema Binder)
// ==========================================
// 职责: 原始字符串表 → 强类型记录
// 规则:
// - 必需列仅对非空表强制校验,缺失即致命错误
// - 数值单元格为空按缺省值处理,无法解析为致命错误
// - 订单数量 <= 0 的行丢弃,完全重复的订单行丢弃
// - 预测表中维度列/参数列以外的数值列都作为度量保存
// ==========================================

use crate::config::column_names::{graph_columns, stream_columns, BucketColumns, ColumnNames};
use crate::config::parameter_source::string_to_bool;
use crate::config::NettingConfig;
use crate::domain::inputs::NettingInputs;
use crate::domain::records::{
    AssociationEdge, BucketParams, Coord, ForecastRecord, OrderRecord, SupplyRecord, UpwardLevels,
};
use crate::domain::stream::{ForecastStreamParam, OrderStreamParam};
use crate::domain::table::Table;
use crate::engine::bucket_resolver::parse_date;
use crate::engine::error::{NettingError, NettingResult};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

// 表名（用于错误信息）
const ORDERS: &str = "orders";
const FORECASTS: &str = "forecasts";
const SUPPLY: &str = "supply";
const GRAPH: &str = "association_graph";
const ORDER_STREAMS: &str = "order_streams";
const FORECAST_STREAMS: &str = "forecast_streams";

/// 绑定结果
#[derive(Debug, Clone, Default)]
pub struct BoundInputs {
    pub orders: Vec<OrderRecord>,
    pub forecasts: Vec<ForecastRecord>,
    pub supply: Vec<SupplyRecord>,
    pub forecast_measures: HashSet<String>, // 预测表中可用的度量列
    pub association_edges: Vec<AssociationEdge>,
    pub order_stream_params: Vec<OrderStreamParam>,
    pub forecast_stream_params: Vec<ForecastStreamParam>,
    pub reference_bucket: Option<String>,
}

/// 绑定全部输入表
///
/// # 返回
/// - Err(MissingColumn / InvalidNumber / InvalidDate): 结构错误
/// - Err(EmptyInputs): 订单与预测均无可用行
pub fn bind_inputs(inputs: &NettingInputs, config: &NettingConfig) -> NettingResult<BoundInputs> {
    let cols = &config.columns;

    let orders = bind_orders(&inputs.orders, cols)?;
    let (forecasts, forecast_measures) = bind_forecasts(&inputs.forecasts, config)?;
    if orders.is_empty() && forecasts.is_empty() {
        return Err(NettingError::EmptyInputs);
    }

    let supply = bind_supply(&inputs.supply, cols)?;
    let association_edges = if config.use_mapping_graph {
        bind_association_edges(&inputs.association_graph)?
    } else {
        Vec::new()
    };
    let (order_stream_params, forecast_stream_params) = if config.use_multi_stream {
        (
            bind_order_streams(&inputs.order_streams)?,
            bind_forecast_streams(&inputs.forecast_streams)?,
        )
    } else {
        (Vec::new(), Vec::new())
    };
    let reference_bucket = bind_reference_bucket(&inputs.reference_date, cols);

    info!(
        orders = orders.len(),
        forecasts = forecasts.len(),
        supply = supply.len(),
        edges = association_edges.len(),
        reference = ?reference_bucket,
        "输入绑定完成"
    );

    Ok(BoundInputs {
        orders,
        forecasts,
        supply,
        forecast_measures,
        association_edges,
        order_stream_params,
        forecast_stream_params,
        reference_bucket,
    })
}

// ==========================================
// 订单
// ==========================================

pub fn bind_orders(table: &Table, cols: &ColumnNames) -> NettingResult<Vec<OrderRecord>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    require_columns(
        table,
        ORDERS,
        &[
            &cols.version,
            &cols.demand_id,
            &cols.item,
            &cols.location,
            &cols.customer,
            &cols.time,
            &cols.order_quantity,
        ],
    )?;

    let mut seen: HashSet<&Vec<String>> = HashSet::new();
    let mut duplicates = 0usize;
    let mut non_positive = 0usize;
    let mut orders = Vec::with_capacity(table.len());

    for (row, raw) in table.rows.iter().enumerate() {
        if !seen.insert(raw) {
            duplicates += 1;
            continue;
        }
        let reader = RowReader::new(table, ORDERS, row);

        let quantity = reader.number(&cols.order_quantity, 0.0)?;
        if quantity <= 0.0 {
            non_positive += 1;
            continue;
        }
        let open_quantity = reader.number(&cols.open_order_quantity, quantity)?.max(0.0);
        let priority = reader.optional_number(&cols.order_priority)?;
        let due_date = match reader.text(&cols.order_due_date) {
            "" => None,
            text => Some(parse_date(text).ok_or_else(|| NettingError::InvalidDate {
                table: ORDERS.to_string(),
                value: text.to_string(),
            })?),
        };
        let order_type = match reader.text(&cols.order_type) {
            "" => cols.order_quantity.clone(),
            text => text.to_string(),
        };
        let (params, exclude_netting, exclude_planning) = reader.bucket_params(&cols.order_buckets)?;

        orders.push(OrderRecord {
            version: reader.text(&cols.version).to_string(),
            demand_id: reader.text(&cols.demand_id).to_string(),
            coord: reader.coord(cols),
            quantity,
            open_quantity,
            priority,
            params,
            exclude_netting,
            exclude_planning,
            order_type,
            due_date,
        });
    }

    if duplicates > 0 || non_positive > 0 {
        debug!(duplicates, non_positive, "订单行已过滤");
    }
    Ok(orders)
}

// ==========================================
// 预测
// ==========================================

/// # 返回
/// (预测记录, 可用度量列名)
pub fn bind_forecasts(
    table: &Table,
    config: &NettingConfig,
) -> NettingResult<(Vec<ForecastRecord>, HashSet<String>)> {
    let cols = &config.columns;
    if table.is_empty() {
        return Ok((Vec::new(), HashSet::new()));
    }
    let mut required: Vec<&str> = vec![&cols.version, &cols.item, &cols.location, &cols.customer, &cols.time];
    if !config.use_multi_stream {
        required.push(&cols.forecast_quantity);
    }
    require_columns(table, FORECASTS, &required)?;

    // 度量列: 非维度、非参数列，且所有非空值都可解析为数值
    let reserved: HashSet<&str> = [
        cols.version.as_str(),
        cols.demand_id.as_str(),
        cols.item.as_str(),
        cols.location.as_str(),
        cols.customer.as_str(),
        cols.time.as_str(),
    ]
    .into_iter()
    .chain(cols.forecast_buckets.all())
    .collect();

    let mut measures: Vec<&str> = Vec::new();
    let mut ignored: Vec<&str> = Vec::new();
    for (col, name) in table.columns.iter().enumerate() {
        if reserved.contains(name.as_str()) {
            continue;
        }
        let numeric = (0..table.len())
            .map(|r| table.cell(r, col))
            .all(|v| v.is_empty() || v.parse::<f64>().is_ok());
        if numeric || *name == cols.forecast_quantity {
            // 基础预测列必须为数值，非数值由逐行解析报出具体位置
            measures.push(name.as_str());
        } else {
            ignored.push(name.as_str());
        }
    }
    if !ignored.is_empty() {
        debug!(columns = ?ignored, "预测表中的非数值列不作为度量");
    }

    let mut forecasts = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let reader = RowReader::new(table, FORECASTS, row);
        let mut values = BTreeMap::new();
        for name in &measures {
            values.insert(name.to_string(), reader.number(name, 0.0)?);
        }
        let (params, exclude_netting, exclude_planning) = reader.bucket_params(&cols.forecast_buckets)?;
        forecasts.push(ForecastRecord {
            version: reader.text(&cols.version).to_string(),
            coord: reader.coord(cols),
            params,
            exclude_netting,
            exclude_planning,
            measures: values,
        });
    }

    let measure_names = measures.into_iter().map(str::to_string).collect();
    Ok((forecasts, measure_names))
}

// ==========================================
// RTF 供应
// ==========================================

pub fn bind_supply(table: &Table, cols: &ColumnNames) -> NettingResult<Vec<SupplyRecord>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    require_columns(
        table,
        SUPPLY,
        &[&cols.version, &cols.item, &cols.location, &cols.customer, &cols.time, &cols.rtf_quantity],
    )?;

    let mut supply = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let reader = RowReader::new(table, SUPPLY, row);
        supply.push(SupplyRecord {
            version: reader.text(&cols.version).to_string(),
            coord: reader.coord(cols),
            quantity: reader.number(&cols.rtf_quantity, 0.0)?,
        });
    }
    Ok(supply)
}

// ==========================================
// 关联图
// ==========================================

pub fn bind_association_edges(table: &Table) -> NettingResult<Vec<AssociationEdge>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    require_columns(
        table,
        GRAPH,
        &[
            graph_columns::FROM_ITEM,
            graph_columns::FROM_LOCATION,
            graph_columns::FROM_CUSTOMER,
            graph_columns::TO_ITEM,
            graph_columns::TO_LOCATION,
            graph_columns::TO_CUSTOMER,
        ],
    )?;

    let mut edges = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let reader = RowReader::new(table, GRAPH, row);
        edges.push(AssociationEdge {
            from_item: reader.text(graph_columns::FROM_ITEM).to_string(),
            from_location: reader.text(graph_columns::FROM_LOCATION).to_string(),
            from_customer: reader.text(graph_columns::FROM_CUSTOMER).to_string(),
            to_item: reader.text(graph_columns::TO_ITEM).to_string(),
            to_location: reader.text(graph_columns::TO_LOCATION).to_string(),
            to_customer: reader.text(graph_columns::TO_CUSTOMER).to_string(),
            priority: reader.number(graph_columns::PRIORITY, 0.0)?,
            forecast_association: reader.flag_or(graph_columns::FORECAST_ASSOCIATION, true),
            rtf_association: reader.flag_or(graph_columns::RTF_ASSOCIATION, true),
        });
    }
    Ok(edges)
}

// ==========================================
// 流参数表
// ==========================================

pub fn bind_order_streams(table: &Table) -> NettingResult<Vec<OrderStreamParam>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    require_columns(
        table,
        ORDER_STREAMS,
        &[stream_columns::ORDER_STREAM, stream_columns::FORECAST_STREAM_ORDER],
    )?;

    let mut params = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let reader = RowReader::new(table, ORDER_STREAMS, row);
        params.push(OrderStreamParam {
            sequence: reader.number(stream_columns::CONSUMPTION_SEQUENCE, row as f64)?,
            order_stream: reader.text(stream_columns::ORDER_STREAM).to_string(),
            forecast_stream: reader.text(stream_columns::FORECAST_STREAM_ORDER).to_string(),
            rtf_eligible: reader.flag_or(stream_columns::RTF_ORDER_STREAM, true),
            committed_label: reader.text(stream_columns::COMMITTED_ORDER_TYPE).to_string(),
            new_label: reader.text(stream_columns::NEW_ORDER_TYPE).to_string(),
            unforecasted_label: reader.text(stream_columns::UNFORECASTED_ORDER_TYPE).to_string(),
            past_label: reader.text(stream_columns::PAST_ORDER_TYPE).to_string(),
        });
    }
    Ok(params)
}

pub fn bind_forecast_streams(table: &Table) -> NettingResult<Vec<ForecastStreamParam>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    require_columns(table, FORECAST_STREAMS, &[stream_columns::FORECAST_STREAM])?;

    let mut params = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let reader = RowReader::new(table, FORECAST_STREAMS, row);
        params.push(ForecastStreamParam {
            sequence: reader.number(stream_columns::NETTING_SEQUENCE, row as f64)?,
            forecast_stream: reader.text(stream_columns::FORECAST_STREAM).to_string(),
            demand_id: reader.text(stream_columns::FORECAST_DEMAND_ID).to_string(),
            rtf_eligible: reader.flag_or(stream_columns::RTF_FORECAST_STREAM, true),
            committed_label: reader.text(stream_columns::COMMITTED_FORECAST_TYPE).to_string(),
            new_label: reader.text(stream_columns::NEW_FORECAST_TYPE).to_string(),
        });
    }
    Ok(params)
}

// ==========================================
// 参考日期
// ==========================================

/// 参考日期表首行: 优先读时间列，否则读第一列
pub fn bind_reference_bucket(table: &Table, cols: &ColumnNames) -> Option<String> {
    if table.is_empty() {
        return None;
    }
    if table.len() > 1 {
        warn!(rows = table.len(), "参考日期表有多行，仅使用第一行");
    }
    let value = table
        .value(0, &cols.time)
        .unwrap_or_else(|| table.cell(0, 0));
    (!value.is_empty()).then(|| value.to_string())
}

// ==========================================
// 辅助函数
// ==========================================

fn require_columns(table: &Table, name: &str, columns: &[&str]) -> NettingResult<()> {
    match columns.iter().find(|c| !table.has_column(c)) {
        Some(missing) => Err(NettingError::missing_column(name, missing)),
        None => Ok(()),
    }
}

/// 单行读取器：统一处理空值与数值解析错误
struct RowReader<'a> {
    table: &'a Table,
    name: &'static str,
    row: usize,
}

impl<'a> RowReader<'a> {
    fn new(table: &'a Table, name: &'static str, row: usize) -> Self {
        Self { table, name, row }
    }

    /// 文本值（缺列视为空）
    fn text(&self, column: &str) -> &'a str {
        self.table.value(self.row, column).unwrap_or("")
    }

    fn coord(&self, cols: &ColumnNames) -> Coord {
        Coord::new(
            self.text(&cols.item),
            self.text(&cols.location),
            self.text(&cols.customer),
            self.text(&cols.time),
        )
    }

    fn optional_number(&self, column: &str) -> NettingResult<Option<f64>> {
        let text = self.text(column);
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| NettingError::InvalidNumber {
                table: self.name.to_string(),
                row: self.row,
                column: column.to_string(),
                value: text.to_string(),
            })
    }

    fn number(&self, column: &str, default: f64) -> NettingResult<f64> {
        Ok(self.optional_number(column)?.unwrap_or(default))
    }

    /// 非负整数参数（小数截断，负数按 0）
    fn count(&self, column: &str) -> NettingResult<usize> {
        Ok(self.number(column, 0.0)?.max(0.0) as usize)
    }

    /// 布尔标志："1" / "true" 或非零数值为真；缺列或空值取缺省值
    fn flag_or(&self, column: &str, default: bool) -> bool {
        match self.text(column) {
            "" => default,
            text => string_to_bool(text) || text.parse::<f64>().map(|v| v != 0.0).unwrap_or(false),
        }
    }

    /// # 返回
    /// (冲减窗口参数, 排除冲减, 排除计划)
    fn bucket_params(&self, columns: &BucketColumns) -> NettingResult<(BucketParams, bool, bool)> {
        let params = BucketParams {
            backward: self.count(&columns.backward)?,
            forward: self.count(&columns.forward)?,
            upward: UpwardLevels {
                item: self.count(&columns.upward_item)?,
                location: self.count(&columns.upward_location)?,
                customer: self.count(&columns.upward_customer)?,
                time: self.count(&columns.upward_time)?,
            },
        };
        Ok((
            params,
            self.flag_or(&columns.exclude_netting, false),
            self.flag_or(&columns.exclude_planning, false),
        ))
    }
}
