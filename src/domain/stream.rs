// ==========================================
// 需求冲减引擎 - 流参数行
// ==========================================
// 多流冲减模式下的订单流/预测流参数,由参数表绑定而来
// ==========================================

use serde::{Deserialize, Serialize};

/// 订单流参数行：一个订单流可对应多条（多个预测流）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStreamParam {
    pub sequence: f64, // Forecast Consumption Sequence
    pub order_stream: String,
    pub forecast_stream: String,
    pub rtf_eligible: bool,
    pub committed_label: String,
    pub new_label: String,
    pub unforecasted_label: String,
    pub past_label: String,
}

/// 预测流参数行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastStreamParam {
    pub sequence: f64, // Forecast Netting Sequence
    pub forecast_stream: String,
    pub demand_id: String,
    pub rtf_eligible: bool,
    pub committed_label: String,
    pub new_label: String,
}
