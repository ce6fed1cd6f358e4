// ==========================================
// 输入表构建器 - 用于集成测试
// ==========================================

use demand_netting::Table;

pub const VERSION: &str = "CW";

// ==========================================
// 通用构建器
// ==========================================

pub struct TableBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// 订单表: 版本、需求号、四维坐标、数量、向后/向前桶数
    pub fn orders() -> Self {
        Self::new(&[
            "Version",
            "DemandID",
            "Item",
            "Location",
            "Customer Group",
            "Week",
            "Order Quantity",
            "Netting Backward Buckets Order",
            "Netting Forward Buckets Order",
        ])
    }

    /// 预测表: 版本、四维坐标、基础预测
    pub fn forecasts() -> Self {
        Self::new(&["Version", "Item", "Location", "Customer Group", "Week", "Base Forecast Quantity"])
    }

    pub fn supply() -> Self {
        Self::new(&["Version", "Item", "Location", "Customer Group", "Week", "RTF"])
    }

    /// 追加一列（已有行补空值）
    pub fn column(mut self, name: &str) -> Self {
        self.columns.push(name.to_string());
        for row in self.rows.iter_mut() {
            row.push(String::new());
        }
        self
    }

    pub fn row(mut self, values: &[&str]) -> Self {
        assert_eq!(values.len(), self.columns.len(), "行宽与列数不一致");
        self.rows.push(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// 订单行快捷方式（版本取 CW）
    pub fn order(self, id: &str, coord: [&str; 4], quantity: f64, backward: u32, forward: u32) -> Self {
        let quantity = quantity.to_string();
        let backward = backward.to_string();
        let forward = forward.to_string();
        self.row(&[
            VERSION, id, coord[0], coord[1], coord[2], coord[3], &quantity, &backward, &forward,
        ])
    }

    pub fn forecast(self, coord: [&str; 4], quantity: f64) -> Self {
        let quantity = quantity.to_string();
        self.row(&[VERSION, coord[0], coord[1], coord[2], coord[3], &quantity])
    }

    pub fn rtf(self, coord: [&str; 4], quantity: f64) -> Self {
        let quantity = quantity.to_string();
        self.row(&[VERSION, coord[0], coord[1], coord[2], coord[3], &quantity])
    }

    pub fn build(self) -> Table {
        Table::from_rows(self.columns, self.rows)
    }
}
