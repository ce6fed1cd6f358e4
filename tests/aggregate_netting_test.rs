// ==========================================
// 聚合冲减集成测试
// ==========================================
// 覆盖: 原始粒度优先消耗、聚合粒度冲减、预测拆回原始坐标、
//       聚合粒度输出、RTF 聚合
// ==========================================

mod helpers;

use demand_netting::domain::demand_types;
use demand_netting::{NettingConfig, NettingInputs, NettingStage, Table};
use helpers::scenario::{assert_close, quantity_at, run, total_of};
use helpers::table_builder::TableBuilder;

fn inputs() -> NettingInputs {
    NettingInputs {
        orders: TableBuilder::orders().order("O1", ["A1", "L", "C", "W1"], 10.0, 0, 0).build(),
        forecasts: TableBuilder::forecasts()
            .forecast(["A1", "L", "C", "W1"], 4.0)
            .forecast(["A2", "L", "C", "W1"], 8.0)
            .build(),
        item_hierarchy: Table::from_rows(
            vec!["Item", "Product Line", "Brand"],
            vec![vec!["A1", "PL1", "B1"], vec!["A2", "PL1", "B1"]],
        ),
        ..Default::default()
    }
}

fn config() -> NettingConfig {
    NettingConfig {
        use_aggregate: true,
        aggregate_levels: vec!["Product Line".to_string()],
        pegging: true,
        ..Default::default()
    }
}

#[test]
fn test_native_then_aggregate() {
    let output = run(&inputs(), config());

    assert_eq!(
        output.stages[..4],
        [
            NettingStage::Init,
            NettingStage::Preprocess,
            NettingStage::AggregateLift,
            NettingStage::NativeNet,
        ]
    );
    assert_close(quantity_at(&output.order_demand_types, "A1", "W1", demand_types::NEW_ORDER), 10.0);

    // 原始粒度 4 → A1，聚合粒度 6 → PL1
    let to_native: f64 = output.pegging.iter().filter(|p| p.to_item == "A1").map(|p| p.quantity).sum();
    let to_aggregate: f64 = output.pegging.iter().filter(|p| p.to_item == "PL1").map(|p| p.quantity).sum();
    assert_close(to_native, 4.0);
    assert_close(to_aggregate, 6.0);
    assert!(output.pegging.iter().all(|p| p.from_item == "A1"));

    // 剩余 2 拆回仍有剩余的 A2
    assert_close(quantity_at(&output.forecast_demand_types, "A2", "W1", demand_types::NEW_FCST), 2.0);
    assert_close(total_of(&output.forecast_demand_types, demand_types::NEW_FCST), 2.0);
}

#[test]
fn test_without_native_first_splits_by_remaining() {
    let config = NettingConfig {
        consume_native_first: false,
        ..config()
    };
    let output = run(&inputs(), config);

    assert!(output.stages.contains(&NettingStage::AggregateLift));
    assert!(!output.stages.contains(&NettingStage::NativeNet));
    // 原始粒度未被消耗: 权重 4 : 8
    let forecasts = &output.forecast_demand_types;
    assert_close(quantity_at(forecasts, "A1", "W1", demand_types::NEW_FCST), 0.6667);
    assert_close(quantity_at(forecasts, "A2", "W1", demand_types::NEW_FCST), 1.3333);
}

#[test]
fn test_output_at_aggregate_grain() {
    let config = NettingConfig {
        output_at_aggregate_grain: true,
        ..config()
    };
    let output = run(&inputs(), config);

    assert_close(quantity_at(&output.order_demand_types, "PL1", "W1", demand_types::NEW_ORDER), 10.0);
    assert_close(quantity_at(&output.forecast_demand_types, "PL1", "W1", demand_types::NEW_FCST), 2.0);
    assert!(output.forecast_demand_types.iter().all(|r| r.item == "PL1"));
}

#[test]
fn test_rtf_summed_at_aggregate_grain() {
    let mut inputs = inputs();
    inputs.supply = TableBuilder::supply()
        .rtf(["A1", "L", "C", "W1"], 3.0)
        .rtf(["A2", "L", "C", "W1"], 4.0)
        .build();
    let output = run(&inputs, config());

    // 订单先占满 7 个 RTF
    assert_close(quantity_at(&output.order_demand_types, "A1", "W1", demand_types::COM_ORDER), 7.0);
    assert_close(quantity_at(&output.order_demand_types, "A1", "W1", demand_types::NEW_ORDER), 3.0);
    let rtf_pegging: Vec<_> = output.pegging.iter().filter(|p| p.measure == "RTF").collect();
    assert_eq!(rtf_pegging.len(), 1);
    assert_eq!(rtf_pegging[0].to_item, "PL1");
    assert_close(rtf_pegging[0].quantity, 7.0);
}

#[test]
fn test_unknown_level_nets_at_native_grain() {
    let config = NettingConfig {
        aggregate_levels: vec!["Planet".to_string()],
        ..config()
    };
    let output = run(&inputs(), config);

    assert!(!output.stages.contains(&NettingStage::AggregateLift));
    assert_close(quantity_at(&output.order_demand_types, "A1", "W1", demand_types::NEW_ORDER), 4.0);
    assert_close(quantity_at(&output.order_demand_types, "A1", "W1", demand_types::UNF_ORDER), 6.0);
}
