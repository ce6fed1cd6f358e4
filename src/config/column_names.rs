// ==========================================
// 需求冲减引擎 - 列名配置
// ==========================================
// 职责: 所有输入/输出表的列名,带默认值,部分可被参数覆写
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// 冲减窗口相关列（订单与预测各一套）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketColumns {
    pub backward: String,
    pub forward: String,
    pub upward_item: String,
    pub upward_location: String,
    pub upward_customer: String,
    pub upward_time: String,
    pub exclude_netting: String,
    pub exclude_planning: String,
}

impl BucketColumns {
    pub fn order_defaults() -> Self {
        Self {
            backward: "Netting Backward Buckets Order".to_string(),
            forward: "Netting Forward Buckets Order".to_string(),
            upward_item: "Netting Item Upward Levels Order".to_string(),
            upward_location: "Netting Location Upward Levels Order".to_string(),
            upward_customer: "Netting Sales Domain Upward Levels Order".to_string(),
            upward_time: "Netting Time Upward Levels Order".to_string(),
            exclude_netting: "Exclude from Netting Order".to_string(),
            exclude_planning: "Exclude from Planning Order".to_string(),
        }
    }

    pub fn forecast_defaults() -> Self {
        Self {
            backward: "Netting Backward Buckets Forecast".to_string(),
            forward: "Netting Forward Buckets Forecast".to_string(),
            upward_item: "Netting Item Upward Levels Forecast".to_string(),
            upward_location: "Netting Location Upward Levels Forecast".to_string(),
            upward_customer: "Netting Sales Domain Upward Levels Forecast".to_string(),
            upward_time: "Netting Time Upward Levels Forecast".to_string(),
            exclude_netting: "Exclude from Netting Forecast".to_string(),
            exclude_planning: "Exclude from Planning Forecast".to_string(),
        }
    }

    /// 全部列名（用于从预测度量中排除参数列）
    pub fn all(&self) -> [&str; 8] {
        [
            &self.backward,
            &self.forward,
            &self.upward_item,
            &self.upward_location,
            &self.upward_customer,
            &self.upward_time,
            &self.exclude_netting,
            &self.exclude_planning,
        ]
    }
}

// ==========================================
// 列名总表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnNames {
    // ===== 公共维度 =====
    pub version: String,
    pub demand_id: String,
    pub demand_type: String,
    pub item: String,
    pub location: String,
    pub customer: String,
    pub time: String, // 冲减时间粒度

    // ===== 订单 =====
    pub order_quantity: String,
    pub open_order_quantity: String,
    pub order_priority: String,
    pub order_type: String,
    pub order_due_date: String,
    pub order_buckets: BucketColumns,

    // ===== 预测 / RTF =====
    pub forecast_quantity: String,
    pub rtf_quantity: String,
    pub forecast_buckets: BucketColumns,

    // ===== 时间伸缩表 =====
    pub partial_week: String,
    pub day: String,

    // ===== 输出 =====
    pub output_quantity: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            version: "Version".to_string(),
            demand_id: "DemandID".to_string(),
            demand_type: "Demand Type".to_string(),
            item: "Item".to_string(),
            location: "Location".to_string(),
            customer: "Customer Group".to_string(),
            time: "Week".to_string(),
            order_quantity: "Order Quantity".to_string(),
            open_order_quantity: "Open Order Quantity".to_string(),
            order_priority: "Order Priority".to_string(),
            order_type: "Order Type".to_string(),
            order_due_date: "Order Due Date".to_string(),
            order_buckets: BucketColumns::order_defaults(),
            forecast_quantity: "Base Forecast Quantity".to_string(),
            rtf_quantity: "RTF".to_string(),
            forecast_buckets: BucketColumns::forecast_defaults(),
            partial_week: "Partial Week".to_string(),
            day: "Day".to_string(),
            output_quantity: "Netted Demand Quantity".to_string(),
        }
    }
}

// ==========================================
// 固定列名（关联图 / 流参数表）
// ==========================================
pub mod graph_columns {
    pub const FROM_ITEM: &str = "From Item";
    pub const FROM_LOCATION: &str = "From Location";
    pub const FROM_CUSTOMER: &str = "From Customer";
    pub const TO_ITEM: &str = "To Item";
    pub const TO_LOCATION: &str = "To Location";
    pub const TO_CUSTOMER: &str = "To Customer";
    pub const PRIORITY: &str = "Forecast Order Priority";
    pub const FORECAST_ASSOCIATION: &str = "Forecast Order Association";
    pub const RTF_ASSOCIATION: &str = "Forecast Order RTF Association";
}

pub mod stream_columns {
    // 订单流参数表
    pub const CONSUMPTION_SEQUENCE: &str = "Forecast Consumption Sequence";
    pub const ORDER_STREAM: &str = "Order Stream";
    pub const FORECAST_STREAM_ORDER: &str = "Forecast Stream Order";
    pub const RTF_ORDER_STREAM: &str = "RTF Netting Order Stream";
    pub const COMMITTED_ORDER_TYPE: &str = "Committed Order Demand Type";
    pub const NEW_ORDER_TYPE: &str = "New Order Demand Type";
    pub const UNFORECASTED_ORDER_TYPE: &str = "Unforecasted Order Demand Type";
    pub const PAST_ORDER_TYPE: &str = "Past Order Demand Type";

    // 预测流参数表
    pub const NETTING_SEQUENCE: &str = "Forecast Netting Sequence";
    pub const FORECAST_STREAM: &str = "Forecast Stream";
    pub const FORECAST_DEMAND_ID: &str = "Forecast Demand ID";
    pub const RTF_FORECAST_STREAM: &str = "RTF Netting Forecast Stream";
    pub const COMMITTED_FORECAST_TYPE: &str = "Committed Forecast Demand Type";
    pub const NEW_FORECAST_TYPE: &str = "New Forecast Demand Type";
}
