// ==========================================
// 需求冲减引擎 - 输入目录读取 / 输出目录写入
// ==========================================
// 输入: 约定文件名的 CSV + parameters.json (扁平 键 → 值)
// 输出: 订单需求类型表 / 预测需求类型表 / Pegging 表
// 约定: 可选文件缺失时视为空表
// ==========================================

use crate::config::ColumnNames;
use crate::domain::inputs::NettingInputs;
use crate::domain::output::{DemandTypeRow, NettingOutput, PeggingRow};
use crate::domain::table::Table;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{CsvTableParser, TableParser};
use csv::Writer;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

// ==========================================
// 约定文件名
// ==========================================
pub mod file_names {
    pub const ORDERS: &str = "orders.csv";
    pub const FORECASTS: &str = "forecasts.csv";
    pub const SUPPLY: &str = "supply.csv";
    pub const ITEM_HIERARCHY: &str = "item_hierarchy.csv";
    pub const LOCATION_HIERARCHY: &str = "location_hierarchy.csv";
    pub const CUSTOMER_HIERARCHY: &str = "customer_hierarchy.csv";
    pub const TIME_HIERARCHY: &str = "time_hierarchy.csv";
    pub const TELESCOPIC: &str = "telescopic.csv";
    pub const ASSOCIATION_GRAPH: &str = "association_graph.csv";
    pub const ORDER_STREAMS: &str = "order_streams.csv";
    pub const FORECAST_STREAMS: &str = "forecast_streams.csv";
    pub const REFERENCE_DATE: &str = "reference_date.csv";
    pub const BASIS: &str = "basis.csv";
    pub const PARAMETERS: &str = "parameters.json";

    pub const ORDER_DEMAND_TYPES: &str = "order_demand_types.csv";
    pub const FORECAST_DEMAND_TYPES: &str = "forecast_demand_types.csv";
    pub const PEGGING: &str = "pegging.csv";
}

// ==========================================
// Pegging 输出列名
// ==========================================
pub mod pegging_columns {
    pub const SEQUENCE: &str = "Pegging Sequence";
    pub const FROM_DEMAND_ID: &str = "From DemandID";
    pub const FROM_ITEM: &str = "From Item";
    pub const FROM_LOCATION: &str = "From Location";
    pub const FROM_CUSTOMER: &str = "From Customer";
    pub const FROM_TIME: &str = "From Time";
    pub const TO_ITEM: &str = "To Item";
    pub const TO_LOCATION: &str = "To Location";
    pub const TO_CUSTOMER: &str = "To Customer";
    pub const TO_TIME: &str = "To Time";
    pub const QUANTITY: &str = "Pegged Quantity";
    pub const MEASURE: &str = "Pegged Measure";
}

// ==========================================
// InputLoader
// ==========================================
pub struct InputLoader<P: TableParser = CsvTableParser> {
    parser: P,
}

impl InputLoader<CsvTableParser> {
    pub fn new() -> Self {
        Self { parser: CsvTableParser }
    }
}

impl Default for InputLoader<CsvTableParser> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: TableParser> InputLoader<P> {
    pub fn with_parser(parser: P) -> Self {
        Self { parser }
    }

    /// 读取输入目录
    ///
    /// # 返回
    /// - Err(FileNotFound): 输入目录不存在
    pub fn load_dir(&self, dir: &Path) -> ImportResult<NettingInputs> {
        if !dir.is_dir() {
            return Err(ImportError::FileNotFound(dir.display().to_string()));
        }

        let inputs = NettingInputs {
            orders: self.load_optional(dir, file_names::ORDERS)?,
            forecasts: self.load_optional(dir, file_names::FORECASTS)?,
            supply: self.load_optional(dir, file_names::SUPPLY)?,
            item_hierarchy: self.load_optional(dir, file_names::ITEM_HIERARCHY)?,
            location_hierarchy: self.load_optional(dir, file_names::LOCATION_HIERARCHY)?,
            customer_hierarchy: self.load_optional(dir, file_names::CUSTOMER_HIERARCHY)?,
            time_hierarchy: self.load_optional(dir, file_names::TIME_HIERARCHY)?,
            telescopic: self.load_optional(dir, file_names::TELESCOPIC)?,
            basis: self.load_optional(dir, file_names::BASIS)?,
            association_graph: self.load_optional(dir, file_names::ASSOCIATION_GRAPH)?,
            order_streams: self.load_optional(dir, file_names::ORDER_STREAMS)?,
            forecast_streams: self.load_optional(dir, file_names::FORECAST_STREAMS)?,
            reference_date: self.load_optional(dir, file_names::REFERENCE_DATE)?,
            parameters: load_parameters(&dir.join(file_names::PARAMETERS))?,
        };

        info!(
            dir = %dir.display(),
            orders = inputs.orders.len(),
            forecasts = inputs.forecasts.len(),
            supply = inputs.supply.len(),
            parameters = inputs.parameters.len(),
            "输入目录读取完成"
        );
        Ok(inputs)
    }

    fn load_optional(&self, dir: &Path, name: &str) -> ImportResult<Table> {
        let path = dir.join(name);
        if !path.exists() {
            debug!(file = name, "可选输入文件不存在，按空表处理");
            return Ok(Table::default());
        }
        self.parser.parse_table(&path)
    }
}

/// 读取参数文件：JSON 对象，值可以是字符串、数字或布尔
pub fn load_parameters(path: &Path) -> ImportResult<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let text = fs::read_to_string(path)?;
    parse_parameters(&text)
}

pub fn parse_parameters(text: &str) -> ImportResult<HashMap<String, String>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Object(map) = value else {
        return Err(ImportError::JsonParseError("参数文件必须是 JSON 对象".to_string()));
    };

    let mut params = HashMap::with_capacity(map.len());
    for (key, value) in map {
        let text = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => continue,
            other => {
                return Err(ImportError::ParameterValueError {
                    key,
                    message: format!("不支持的参数值类型: {}", other),
                })
            }
        };
        params.insert(key, text);
    }
    Ok(params)
}

// ==========================================
// OutputWriter
// ==========================================
pub struct OutputWriter<'a> {
    columns: &'a ColumnNames,
}

impl<'a> OutputWriter<'a> {
    pub fn new(columns: &'a ColumnNames) -> Self {
        Self { columns }
    }

    /// 写出三张输出表（目录不存在时创建）
    pub fn write_dir(&self, dir: &Path, output: &NettingOutput) -> ImportResult<()> {
        fs::create_dir_all(dir).map_err(write_error)?;
        self.write_demand_types(&dir.join(file_names::ORDER_DEMAND_TYPES), &output.order_demand_types)?;
        self.write_demand_types(&dir.join(file_names::FORECAST_DEMAND_TYPES), &output.forecast_demand_types)?;
        self.write_pegging(&dir.join(file_names::PEGGING), &output.pegging)?;
        info!(
            dir = %dir.display(),
            order_rows = output.order_demand_types.len(),
            forecast_rows = output.forecast_demand_types.len(),
            pegging_rows = output.pegging.len(),
            "输出写入完成"
        );
        Ok(())
    }

    /// 维度列在前，度量列在后
    pub fn write_demand_types(&self, path: &Path, rows: &[DemandTypeRow]) -> ImportResult<()> {
        let c = self.columns;
        let mut writer = Writer::from_path(path).map_err(write_error)?;
        writer.write_record([
            c.version.as_str(),
            c.item.as_str(),
            c.location.as_str(),
            c.customer.as_str(),
            c.time.as_str(),
            c.demand_id.as_str(),
            c.demand_type.as_str(),
            c.output_quantity.as_str(),
        ])
        .map_err(write_error)?;
        for row in rows {
            writer.write_record([
                row.version.as_str(),
                row.item.as_str(),
                row.location.as_str(),
                row.customer.as_str(),
                row.time.as_str(),
                row.demand_id.as_str(),
                row.demand_type.as_str(),
                row.quantity.to_string().as_str(),
            ])
            .map_err(write_error)?;
        }
        writer.flush().map_err(write_error)?;
        Ok(())
    }

    pub fn write_pegging(&self, path: &Path, rows: &[PeggingRow]) -> ImportResult<()> {
        let mut writer = Writer::from_path(path).map_err(write_error)?;
        writer.write_record([
            self.columns.version.as_str(),
            pegging_columns::SEQUENCE,
            pegging_columns::FROM_DEMAND_ID,
            pegging_columns::FROM_ITEM,
            pegging_columns::FROM_LOCATION,
            pegging_columns::FROM_CUSTOMER,
            pegging_columns::FROM_TIME,
            pegging_columns::TO_ITEM,
            pegging_columns::TO_LOCATION,
            pegging_columns::TO_CUSTOMER,
            pegging_columns::TO_TIME,
            pegging_columns::QUANTITY,
            pegging_columns::MEASURE,
        ])
        .map_err(write_error)?;
        for row in rows {
            writer.write_record([
                row.version.as_str(),
                row.sequence.to_string().as_str(),
                row.from_demand_id.as_str(),
                row.from_item.as_str(),
                row.from_location.as_str(),
                row.from_customer.as_str(),
                row.from_time.as_str(),
                row.to_item.as_str(),
                row.to_location.as_str(),
                row.to_customer.as_str(),
                row.to_time.as_str(),
                row.quantity.to_string().as_str(),
                row.measure.as_str(),
            ])
            .map_err(write_error)?;
        }
        writer.flush().map_err(write_error)?;
        Ok(())
    }
}

fn write_error<E: std::fmt::Display>(err: E) -> ImportError {
    ImportError::FileWriteError(err.to_string())
}
