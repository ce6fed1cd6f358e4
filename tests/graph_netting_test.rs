// ==========================================
// 关联图冲减集成测试
// ==========================================

mod helpers;

use demand_netting::domain::demand_types;
use demand_netting::{NettingConfig, NettingInputs, NettingStage, Table};
use helpers::scenario::{assert_close, quantity_at, run, total_of};
use helpers::table_builder::TableBuilder;

fn association_graph() -> Table {
    TableBuilder::new(&[
        "From Item",
        "From Location",
        "From Customer",
        "To Item",
        "To Location",
        "To Customer",
        "Forecast Order Priority",
        "Forecast Order Association",
        "Forecast Order RTF Association",
    ])
    .row(&["A", "L", "C", "Y", "L", "C", "2", "1", "1"])
    .row(&["A", "L", "C", "X", "L", "C", "1", "1", "0"])
    .build()
}

fn inputs() -> NettingInputs {
    NettingInputs {
        orders: TableBuilder::orders().order("O1", ["A", "L", "C", "W1"], 8.0, 0, 0).build(),
        forecasts: TableBuilder::forecasts()
            .forecast(["X", "L", "C", "W1"], 3.0)
            .forecast(["Y", "L", "C", "W1"], 10.0)
            .build(),
        supply: TableBuilder::supply()
            .rtf(["X", "L", "C", "W1"], 10.0)
            .rtf(["Y", "L", "C", "W1"], 2.0)
            .build(),
        association_graph: association_graph(),
        ..Default::default()
    }
}

fn config() -> NettingConfig {
    NettingConfig {
        use_mapping_graph: true,
        pegging: true,
        ..Default::default()
    }
}

#[test]
fn test_targets_consumed_by_priority() {
    let output = run(&inputs(), config());

    assert!(output.stages.contains(&NettingStage::GraphNet));
    assert!(!output.stages.contains(&NettingStage::ForecastNet));

    let forecast_pegging: Vec<_> = output
        .pegging
        .iter()
        .filter(|p| p.measure == "Base Forecast Quantity")
        .collect();
    assert_eq!(forecast_pegging.len(), 2);
    assert_eq!(forecast_pegging[0].to_item, "X");
    assert_close(forecast_pegging[0].quantity, 3.0);
    assert_eq!(forecast_pegging[1].to_item, "Y");
    assert_close(forecast_pegging[1].quantity, 5.0);
}

#[test]
fn test_rtf_uses_rtf_associations_only() {
    let output = run(&inputs(), config());
    let orders = &output.order_demand_types;

    // X 没有 RTF 关联，只能用 Y 的 2
    assert_close(total_of(orders, demand_types::COM_ORDER), 2.0);
    assert_close(total_of(orders, demand_types::NEW_ORDER), 6.0);
    assert_close(total_of(orders, demand_types::UNF_ORDER), 0.0);
    assert!(output.pegging.iter().filter(|p| p.measure == "RTF").all(|p| p.to_item == "Y"));

    // Y 剩余 5 成为伪订单; 伪订单坐标没有关联，不覆盖 RTF
    assert_close(quantity_at(&output.forecast_demand_types, "Y", "W1", demand_types::NEW_FCST), 5.0);
}

#[test]
fn test_graph_takes_precedence_over_aggregate() {
    let mut inputs = inputs();
    inputs.item_hierarchy = Table::from_rows(vec!["Item", "Group"], vec![vec!["A", "G"], vec!["X", "G"], vec!["Y", "G"]]);
    let config = NettingConfig {
        use_aggregate: true,
        aggregate_levels: vec!["Group".to_string()],
        ..config()
    };
    let output = run(&inputs, config);

    assert!(!output.stages.contains(&NettingStage::AggregateLift));
    assert!(output.stages.contains(&NettingStage::GraphNet));
    assert_close(total_of(&output.order_demand_types, demand_types::NEW_ORDER), 6.0);
}

#[test]
fn test_empty_graph_finds_no_candidates() {
    let mut inputs = inputs();
    inputs.association_graph = Table::default();
    let output = run(&inputs, config());

    assert_close(total_of(&output.order_demand_types, demand_types::UNF_ORDER), 8.0);
    assert!(output.pegging.is_empty());
}
