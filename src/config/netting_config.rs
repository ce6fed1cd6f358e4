// ==========================================
// 需求冲减引擎 - 冲减配置
// ==========================================
// 职责: 将扁平参数表 (选项名 → 字符串) 一次性解析为强类型配置
// 约定: 引擎内部只读取 NettingConfig,不再按选项名查找
// ==========================================

use crate::config::column_names::ColumnNames;
use crate::config::parameter_source::{string_to_bool, string_to_int, ParameterSource};
use crate::domain::types::{BasisRoundingPolicy, ProfileSpreadMethod, TimeGrain};
use crate::engine::error::{NettingError, NettingResult};
use crate::engine::tuple_generator::{validate_consumption_order, TupleMode};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CONSUMPTION_ORDER: &str = "ILSBF";
pub const DEFAULT_HIERARCHICAL_ORDER: &str = "ILST";

// ==========================================
// 画像配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilingConfig {
    pub telescopic_attribute: String, // 伸缩输出时间属性 (如 Partial Week)
    pub final_attribute: String,      // 最终输出时间属性
    pub spread_method: ProfileSpreadMethod,
    pub basis_measure: String,
    pub rounding_policy: BasisRoundingPolicy,
    pub assortment_measure: String,
}

// ==========================================
// 冲减配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NettingConfig {
    pub columns: ColumnNames,

    // ===== 模式开关 =====
    pub use_multi_stream: bool,
    pub use_mapping_graph: bool,
    pub use_aggregate: bool,
    pub pegging: bool,
    pub split_demand_types: bool,
    pub disable_buckets: bool,
    pub skip_netting: bool,
    pub output_at_aggregate_grain: bool,
    pub time_hierarchy: bool,
    pub backward_before_current: bool,
    pub consume_native_first: bool,
    pub prioritize_by_time: bool,

    // ===== 消耗顺序 =====
    pub consumption_order: String,
    pub hierarchical_order: String,

    // ===== 聚合冲减 =====
    pub aggregate_levels: Vec<String>,

    // ===== 展望期 =====
    pub order_horizon: i64, // -1: 不限
    pub horizon_grain: TimeGrain,

    // ===== 画像 =====
    pub profiling: ProfilingConfig,
}

impl Default for NettingConfig {
    fn default() -> Self {
        let columns = ColumnNames::default();
        let telescopic_attribute = columns.time.clone();
        Self {
            columns,
            use_multi_stream: false,
            use_mapping_graph: false,
            use_aggregate: false,
            pegging: false,
            split_demand_types: true,
            disable_buckets: false,
            skip_netting: false,
            output_at_aggregate_grain: false,
            time_hierarchy: false,
            backward_before_current: false,
            consume_native_first: true,
            prioritize_by_time: false,
            consumption_order: DEFAULT_CONSUMPTION_ORDER.to_string(),
            hierarchical_order: DEFAULT_HIERARCHICAL_ORDER.to_string(),
            aggregate_levels: Vec::new(),
            order_horizon: -1,
            horizon_grain: TimeGrain::Week,
            profiling: ProfilingConfig {
                telescopic_attribute,
                final_attribute: "Week".to_string(),
                spread_method: ProfileSpreadMethod::FirstBucket,
                basis_measure: "W Netting Split Intermediate".to_string(),
                rounding_policy: BasisRoundingPolicy::Distribute,
                assortment_measure: "W Netting Split Applicable Weeks".to_string(),
            },
        }
    }
}

impl NettingConfig {
    /// 从扁平参数表解析配置
    ///
    /// # 参数
    /// - params: 选项名 → 字符串值
    ///
    /// # 返回
    /// - Err(InvalidConsumptionOrder): 当前模式的消耗顺序字符串无效
    pub fn from_parameters<P: ParameterSource + ?Sized>(params: &P) -> NettingResult<Self> {
        let mut config = NettingConfig::default();

        // ===== 列名覆写 =====
        {
            let c = &mut config.columns;
            let overrides: [(&str, &mut String); 27] = [
                (config_keys::ITEM_ATTRIBUTE, &mut c.item),
                (config_keys::LOCATION_ATTRIBUTE, &mut c.location),
                (config_keys::CUSTOMER_ATTRIBUTE, &mut c.customer),
                (config_keys::TIME_ATTRIBUTE, &mut c.time),
                (config_keys::ORDER_QUANTITY, &mut c.order_quantity),
                (config_keys::OPEN_ORDER_QUANTITY, &mut c.open_order_quantity),
                (config_keys::ORDER_PRIORITY, &mut c.order_priority),
                (config_keys::ORDER_TYPE, &mut c.order_type),
                (config_keys::ORDER_DUE_DATE, &mut c.order_due_date),
                (config_keys::ORDER_BACKWARD_BUCKETS, &mut c.order_buckets.backward),
                (config_keys::ORDER_FORWARD_BUCKETS, &mut c.order_buckets.forward),
                (config_keys::ORDER_UPWARD_ITEM, &mut c.order_buckets.upward_item),
                (config_keys::ORDER_UPWARD_LOCATION, &mut c.order_buckets.upward_location),
                (config_keys::ORDER_UPWARD_CUSTOMER, &mut c.order_buckets.upward_customer),
                (config_keys::ORDER_UPWARD_TIME, &mut c.order_buckets.upward_time),
                (config_keys::ORDER_EXCLUDE_NETTING, &mut c.order_buckets.exclude_netting),
                (config_keys::ORDER_EXCLUDE_PLANNING, &mut c.order_buckets.exclude_planning),
                (config_keys::FORECAST_BACKWARD_BUCKETS, &mut c.forecast_buckets.backward),
                (config_keys::FORECAST_FORWARD_BUCKETS, &mut c.forecast_buckets.forward),
                (config_keys::FORECAST_UPWARD_ITEM, &mut c.forecast_buckets.upward_item),
                (config_keys::FORECAST_UPWARD_LOCATION, &mut c.forecast_buckets.upward_location),
                (config_keys::FORECAST_UPWARD_CUSTOMER, &mut c.forecast_buckets.upward_customer),
                (config_keys::FORECAST_UPWARD_TIME, &mut c.forecast_buckets.upward_time),
                (config_keys::FORECAST_EXCLUDE_NETTING, &mut c.forecast_buckets.exclude_netting),
                (config_keys::FORECAST_EXCLUDE_PLANNING, &mut c.forecast_buckets.exclude_planning),
                (config_keys::FORECAST_MEASURE, &mut c.forecast_quantity),
                (config_keys::RTF_MEASURE, &mut c.rtf_quantity),
            ];
            for (key, slot) in overrides {
                if let Some(value) = params.get_trimmed(key) {
                    *slot = value.to_string();
                }
            }
            if let Some(value) = params.get_trimmed(config_keys::OUTPUT_MEASURE) {
                c.output_quantity = value.to_string();
            }
        }

        // ===== 模式开关 =====
        let flag = |key: &str, default: bool| {
            params
                .get_trimmed(key)
                .map(string_to_bool)
                .unwrap_or(default)
        };
        config.use_multi_stream = flag(config_keys::USE_MULTI_STREAM, false);
        config.use_mapping_graph = flag(config_keys::USE_MAPPING_GRAPH, false);
        config.use_aggregate = flag(config_keys::USE_AGGREGATE, false);
        config.pegging = flag(config_keys::PEGGING, false);
        config.split_demand_types = flag(config_keys::SPLIT_DEMAND_TYPES, true);
        config.disable_buckets = flag(config_keys::DISABLE_BUCKETS, false);
        config.skip_netting = flag(config_keys::SKIP_NETTING, false);
        config.output_at_aggregate_grain = flag(config_keys::OUTPUT_AT_AGGREGATE_GRAIN, false);
        config.time_hierarchy = flag(config_keys::TIME_HIERARCHY, false);
        config.backward_before_current = flag(config_keys::BACKWARD_BEFORE_CURRENT, false);
        config.consume_native_first = flag(config_keys::CONSUME_NATIVE_FIRST, true);
        config.prioritize_by_time = flag(config_keys::PRIORITIZE_BY_TIME, false);

        // ===== 消耗顺序 =====
        if let Some(value) = params.get_trimmed(config_keys::CONSUMPTION_ORDER) {
            config.consumption_order = value.to_uppercase();
        }
        if let Some(value) = params.get_trimmed(config_keys::HIERARCHICAL_ORDER) {
            config.hierarchical_order = value.to_uppercase();
        }

        // ===== 聚合层级 =====
        if let Some(value) = params.get_trimmed(config_keys::AGGREGATE_LEVELS) {
            config.aggregate_levels = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        // ===== 展望期 =====
        if let Some(value) = params.get_trimmed(config_keys::ORDER_HORIZON) {
            config.order_horizon = string_to_int(value);
        }
        if let Some(value) = params.get_trimmed(config_keys::ORDER_HORIZON_GRAIN) {
            config.horizon_grain = TimeGrain::parse(value).unwrap_or_else(|| {
                warn!(config_key = config_keys::ORDER_HORIZON_GRAIN, raw_value = %value, "展望期粒度无法识别，使用 Week");
                TimeGrain::Week
            });
        }

        // ===== 画像 =====
        let profiling = &mut config.profiling;
        profiling.telescopic_attribute = params
            .get_trimmed(config_keys::TELESCOPIC_TIME_ATTRIBUTE)
            .map(str::to_string)
            .unwrap_or_else(|| config.columns.time.clone());
        if let Some(value) = params.get_trimmed(config_keys::FINAL_TIME_ATTRIBUTE) {
            profiling.final_attribute = value.to_string();
        }
        if let Some(value) = params.get_trimmed(config_keys::PROFILING_SPREAD_METHOD) {
            profiling.spread_method = ProfileSpreadMethod::parse(value);
        }
        if let Some(value) = params.get_trimmed(config_keys::PROFILING_BASIS_MEASURE) {
            profiling.basis_measure = value.to_string();
        }
        if let Some(value) = params.get_trimmed(config_keys::PROFILING_BASIS_ROUNDING) {
            profiling.rounding_policy = BasisRoundingPolicy::parse(value);
        }
        if let Some(value) = params.get_trimmed(config_keys::PROFILING_ASSORTMENT_MEASURE) {
            profiling.assortment_measure = value.to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// 校验维度列名互不相同，以及当前模式下的消耗顺序
    pub fn validate(&self) -> NettingResult<()> {
        let c = &self.columns;
        let dimensions = [&c.item, &c.location, &c.customer, &c.time];
        for (i, a) in dimensions.iter().enumerate() {
            if dimensions[i + 1..].contains(a) {
                return Err(NettingError::Config(format!("维度列名重复: {}", a)));
            }
        }
        validate_consumption_order(self.tuple_mode(), self.active_consumption_order())
    }

    pub fn tuple_mode(&self) -> TupleMode {
        if self.time_hierarchy {
            TupleMode::Hierarchical
        } else {
            TupleMode::BackwardForward
        }
    }

    pub fn active_consumption_order(&self) -> &str {
        match self.tuple_mode() {
            TupleMode::Hierarchical => &self.hierarchical_order,
            TupleMode::BackwardForward => &self.consumption_order,
        }
    }

    /// 是否需要画像（最终时间属性与冲减时间属性不同）
    pub fn profiling_enabled(&self) -> bool {
        self.profiling.final_attribute != self.columns.time
            && !(self.use_aggregate && self.output_at_aggregate_grain)
    }
}

// ==========================================
// 参数选项名（与计划平台的参数名称保持一致）
// ==========================================
pub mod config_keys {
    // 模式开关
    pub const USE_MULTI_STREAM: &str = "Use Multi Stream Netting";
    pub const USE_MAPPING_GRAPH: &str = "Use Mapping Graph";
    pub const USE_AGGREGATE: &str = "Use Aggregate Netting";
    pub const PEGGING: &str = "Netting Pegging";
    pub const SPLIT_DEMAND_TYPES: &str = "Split Demand Types";
    pub const DISABLE_BUCKETS: &str = "Disable Buckets";
    pub const SKIP_NETTING: &str = "Skip Netting Mode";
    pub const OUTPUT_AT_AGGREGATE_GRAIN: &str = "Outputs at Aggregated Netting level";
    pub const TIME_HIERARCHY: &str = "Use Time Hierachical instead of Backward Forward";
    pub const BACKWARD_BEFORE_CURRENT: &str = "Reverse Time Backward Consumption Order";
    pub const CONSUME_NATIVE_FIRST: &str = "Consume Self Before consuming at Aggregate Levels";
    pub const PRIORITIZE_BY_TIME: &str = "Prioritize Order and Forecast by Time";

    // 消耗顺序
    pub const CONSUMPTION_ORDER: &str = "Backward Forward Consumption Order";
    pub const HIERARCHICAL_ORDER: &str = "Hierarchical Consumption Order";

    // 聚合与展望期
    pub const AGGREGATE_LEVELS: &str = "Netting Aggregate Levels";
    pub const ORDER_HORIZON: &str = "Order Horizon";
    pub const ORDER_HORIZON_GRAIN: &str = "Order Horizon Grain";

    // 维度属性
    pub const ITEM_ATTRIBUTE: &str = "Netting Item Attribute";
    pub const LOCATION_ATTRIBUTE: &str = "Netting Location Attribute";
    pub const CUSTOMER_ATTRIBUTE: &str = "Netting Customer Attribute";
    pub const TIME_ATTRIBUTE: &str = "Netting Time Attribute";

    // 订单列
    pub const ORDER_QUANTITY: &str = "Netting Order Quantity";
    pub const OPEN_ORDER_QUANTITY: &str = "Netting Open Order Quantity";
    pub const ORDER_PRIORITY: &str = "Netting Order Priority";
    pub const ORDER_TYPE: &str = "Netting Order Type";
    pub const ORDER_DUE_DATE: &str = "Netting Order Due Date";
    pub const ORDER_BACKWARD_BUCKETS: &str = "Netting Order Backward Buckets";
    pub const ORDER_FORWARD_BUCKETS: &str = "Netting Order Forward Buckets";
    pub const ORDER_UPWARD_ITEM: &str = "Netting Order Item Upwards Buckets";
    pub const ORDER_UPWARD_LOCATION: &str = "Netting Order Location Upwards Bucket";
    pub const ORDER_UPWARD_CUSTOMER: &str = "Netting Order Customer Upwards Bucket";
    pub const ORDER_UPWARD_TIME: &str = "Netting Order Time Upwards Bucket";
    pub const ORDER_EXCLUDE_NETTING: &str = "Netting Exclude Order from Netting";
    pub const ORDER_EXCLUDE_PLANNING: &str = "Netting Exclude Order from Planning";

    // 预测列
    pub const FORECAST_MEASURE: &str = "Netting Forecast Measure Name";
    pub const FORECAST_BACKWARD_BUCKETS: &str = "Netting Forecast Backward Buckets";
    pub const FORECAST_FORWARD_BUCKETS: &str = "Netting Forecast Forward Buckets";
    pub const FORECAST_UPWARD_ITEM: &str = "Netting Forecast Item Upwards Buckets";
    pub const FORECAST_UPWARD_LOCATION: &str = "Netting Forecast Location Upwards Bucket";
    pub const FORECAST_UPWARD_CUSTOMER: &str = "Netting Forecast Customer Upwards Bucket";
    pub const FORECAST_UPWARD_TIME: &str = "Netting Forecast Time Upwards Bucket";
    pub const FORECAST_EXCLUDE_NETTING: &str = "Netting Exclude Forecast from Netting";
    pub const FORECAST_EXCLUDE_PLANNING: &str = "Netting Exclude Forecast from Planning";

    // RTF 与输出
    pub const RTF_MEASURE: &str = "Netting RTF Measure Name";
    pub const OUTPUT_MEASURE: &str = "Netting Output Measure Name";

    // 画像
    pub const TELESCOPIC_TIME_ATTRIBUTE: &str = "Netting Output Time Attribute";
    pub const FINAL_TIME_ATTRIBUTE: &str = "Netting Final Output Time Attribute";
    pub const PROFILING_SPREAD_METHOD: &str = "Netting Profiling Spread method";
    pub const PROFILING_BASIS_MEASURE: &str = "Netting Profiling Basis Measure Name";
    pub const PROFILING_BASIS_ROUNDING: &str = "Netting Assortment to Profiled Output Buckets";
    pub const PROFILING_ASSORTMENT_MEASURE: &str = "Netting Profiling Assortment Basis Measure Name";
}
