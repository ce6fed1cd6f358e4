// ==========================================
// 测试场景与输出查询
// ==========================================

use demand_netting::{DemandTypeRow, NettingConfig, NettingInputs, NettingOrchestrator, NettingOutput};

/// 执行一次冲减（失败时直接 panic）
pub fn run(inputs: &NettingInputs, config: NettingConfig) -> NettingOutput {
    demand_netting::logging::init_test();
    NettingOrchestrator::new(config)
        .run(inputs)
        .expect("冲减应当成功")
}

/// 某需求类型的数量合计
pub fn total_of(rows: &[DemandTypeRow], demand_type: &str) -> f64 {
    rows.iter()
        .filter(|r| r.demand_type == demand_type)
        .map(|r| r.quantity)
        .sum()
}

/// 按需求号过滤后的数量合计
pub fn total_for_demand(rows: &[DemandTypeRow], demand_id: &str) -> f64 {
    rows.iter()
        .filter(|r| r.demand_id == demand_id)
        .map(|r| r.quantity)
        .sum()
}

/// 某坐标 + 需求类型的数量
pub fn quantity_at(rows: &[DemandTypeRow], item: &str, time: &str, demand_type: &str) -> f64 {
    rows.iter()
        .filter(|r| r.item == item && r.time == time && r.demand_type == demand_type)
        .map(|r| r.quantity)
        .sum()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}
