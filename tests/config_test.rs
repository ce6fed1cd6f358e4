// ==========================================
// NettingConfig 集成测试
// ==========================================
// 测试目标: 扁平参数表 → 强类型配置的解析与校验
// ==========================================

use demand_netting::config::{config_keys, NettingConfig};
use demand_netting::domain::types::{BasisRoundingPolicy, ProfileSpreadMethod, TimeGrain};
use demand_netting::engine::tuple_generator::TupleMode;
use demand_netting::NettingError;
use std::collections::{BTreeMap, HashMap};

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_empty_parameters_yield_defaults() {
    let config = NettingConfig::from_parameters(&HashMap::new()).expect("默认配置应当有效");

    assert_eq!(config, NettingConfig::default());
    assert!(config.split_demand_types);
    assert!(config.consume_native_first);
    assert!(!config.pegging);
    assert_eq!(config.order_horizon, -1);
    assert_eq!(config.consumption_order, "ILSBF");
    assert_eq!(config.tuple_mode(), TupleMode::BackwardForward);
    assert!(!config.profiling_enabled());
}

#[test]
fn test_boolean_flags() {
    let config = NettingConfig::from_parameters(&params(&[
        (config_keys::PEGGING, "1"),
        (config_keys::USE_MULTI_STREAM, "True"),
        (config_keys::SPLIT_DEMAND_TYPES, "0"),
        (config_keys::CONSUME_NATIVE_FIRST, "false"),
        (config_keys::USE_AGGREGATE, "yes"),
    ]))
    .expect("配置应当有效");

    assert!(config.pegging);
    assert!(config.use_multi_stream);
    assert!(!config.split_demand_types);
    assert!(!config.consume_native_first);
    // 只有 1 / true 视为真
    assert!(!config.use_aggregate);
}

#[test]
fn test_column_overrides() {
    let config = NettingConfig::from_parameters(&params(&[
        (config_keys::ITEM_ATTRIBUTE, "SKU"),
        (config_keys::TIME_ATTRIBUTE, " Month "),
        (config_keys::FORECAST_MEASURE, "Consensus Forecast"),
        (config_keys::ORDER_BACKWARD_BUCKETS, "Back"),
        (config_keys::OUTPUT_MEASURE, "Netted"),
        (config_keys::LOCATION_ATTRIBUTE, "   "),
    ]))
    .expect("配置应当有效");

    let columns = &config.columns;
    assert_eq!(columns.item, "SKU");
    assert_eq!(columns.time, "Month");
    assert_eq!(columns.forecast_quantity, "Consensus Forecast");
    assert_eq!(columns.order_buckets.backward, "Back");
    assert_eq!(columns.output_quantity, "Netted");
    // 空白值视为缺失
    assert_eq!(columns.location, "Location");
    // 伸缩时间属性默认跟随冲减时间列
    assert_eq!(config.profiling.telescopic_attribute, "Month");
}

#[test]
fn test_aggregate_levels_are_split_and_trimmed() {
    let config = NettingConfig::from_parameters(&params(&[(
        config_keys::AGGREGATE_LEVELS,
        " Product Line , ,Brand",
    )]))
    .expect("配置应当有效");

    assert_eq!(config.aggregate_levels, vec!["Product Line", "Brand"]);
}

#[test]
fn test_horizon_parsing() {
    let config = NettingConfig::from_parameters(&params(&[
        (config_keys::ORDER_HORIZON, "4"),
        (config_keys::ORDER_HORIZON_GRAIN, "Month"),
    ]))
    .expect("配置应当有效");
    assert_eq!(config.order_horizon, 4);
    assert_eq!(config.horizon_grain, TimeGrain::Month);

    let config = NettingConfig::from_parameters(&params(&[
        (config_keys::ORDER_HORIZON, "soon"),
        (config_keys::ORDER_HORIZON_GRAIN, "fortnight"),
    ]))
    .expect("配置应当有效");
    assert_eq!(config.order_horizon, -1);
    assert_eq!(config.horizon_grain, TimeGrain::Week);
}

#[test]
fn test_profiling_options() {
    let config = NettingConfig::from_parameters(&params(&[
        (config_keys::TELESCOPIC_TIME_ATTRIBUTE, "Partial Week"),
        (config_keys::FINAL_TIME_ATTRIBUTE, "Partial Week"),
        (config_keys::PROFILING_SPREAD_METHOD, "By Basis"),
        (config_keys::PROFILING_BASIS_ROUNDING, "round up"),
    ]))
    .expect("配置应当有效");

    assert_eq!(config.profiling.spread_method, ProfileSpreadMethod::ByBasis);
    assert_eq!(config.profiling.rounding_policy, BasisRoundingPolicy::RoundUp);
    assert!(config.profiling_enabled());
}

#[test]
fn test_invalid_consumption_order_is_rejected() {
    let result = NettingConfig::from_parameters(&params(&[(config_keys::CONSUMPTION_ORDER, "ilsfb")]));
    assert!(matches!(result, Err(NettingError::InvalidConsumptionOrder { .. })));
}

#[test]
fn test_duplicate_dimension_columns_are_rejected() {
    let result = NettingConfig::from_parameters(&params(&[(config_keys::ITEM_ATTRIBUTE, "Location")]));
    assert!(matches!(result, Err(NettingError::Config(_))));

    let result = NettingConfig::from_parameters(&params(&[(config_keys::TIME_ATTRIBUTE, "Customer Group")]));
    assert!(matches!(result, Err(NettingError::Config(_))));
}

#[test]
fn test_hierarchical_mode_validates_its_own_order() {
    // 时间层级模式下只校验层级消耗顺序
    let config = NettingConfig::from_parameters(&params(&[
        (config_keys::TIME_HIERARCHY, "1"),
        (config_keys::HIERARCHICAL_ORDER, "tsli"),
        (config_keys::CONSUMPTION_ORDER, "garbage"),
    ]))
    .expect("层级顺序有效");

    assert_eq!(config.tuple_mode(), TupleMode::Hierarchical);
    assert_eq!(config.active_consumption_order(), "TSLI");
}

#[test]
fn test_btreemap_source() {
    let mut source = BTreeMap::new();
    source.insert(config_keys::PEGGING.to_string(), "true".to_string());
    let config = NettingConfig::from_parameters(&source).expect("配置应当有效");
    assert!(config.pegging);
}
