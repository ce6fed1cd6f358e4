// ==========================================
// 需求冲减引擎 - 聚合粒度提升 (Aggregate Lifter)
// ==========================================
// 职责: 把原始坐标提升到配置的聚合层级
// 规则: 每个聚合层级名是某个维度层级表中的一列;
//       未配置或无法匹配的维度保持原始粒度
// ==========================================

use crate::config::NettingConfig;
use crate::domain::records::Coord;
use crate::domain::table::Table;
use crate::domain::types::Dimension;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
struct DimensionLift {
    column: String,                   // 聚合列名
    mapping: HashMap<String, String>, // 原始值 → 聚合值
}

#[derive(Debug, Clone, Default)]
pub struct AggregateLifter {
    item: Option<DimensionLift>,
    location: Option<DimensionLift>,
    customer: Option<DimensionLift>,
    time: Option<DimensionLift>,
}

impl AggregateLifter {
    /// 构建提升映射
    ///
    /// # 参数
    /// - tables: 四个维度的层级表，顺序为 item / location / customer / time
    pub fn build(config: &NettingConfig, tables: [&Table; 4]) -> Self {
        let cols = &config.columns;
        let leaf_columns = [
            cols.item.as_str(),
            cols.location.as_str(),
            cols.customer.as_str(),
            cols.time.as_str(),
        ];

        let mut lifter = AggregateLifter::default();
        let mut unmatched: Vec<&str> = Vec::new();

        for level in &config.aggregate_levels {
            let found = Dimension::ALL.iter().enumerate().find(|(i, _)| {
                tables[*i].has_column(level) && tables[*i].has_column(leaf_columns[*i])
            });
            let Some((i, dim)) = found else {
                unmatched.push(level.as_str());
                continue;
            };

            let table = tables[i];
            let mut mapping = HashMap::new();
            for row in 0..table.len() {
                let leaf = table.value(row, leaf_columns[i]).unwrap_or_default();
                let parent = table.value(row, level).unwrap_or_default();
                if !leaf.is_empty() && !parent.is_empty() {
                    mapping.entry(leaf.to_string()).or_insert_with(|| parent.to_string());
                }
            }
            debug!(dimension = %dim, column = %level, values = mapping.len(), "聚合层级映射构建完成");

            let lift = Some(DimensionLift {
                column: level.clone(),
                mapping,
            });
            match dim {
                Dimension::Item => lifter.item = lift,
                Dimension::Location => lifter.location = lift,
                Dimension::Customer => lifter.customer = lift,
                Dimension::Time => lifter.time = lift,
            }
        }

        if !unmatched.is_empty() {
            warn!(levels = ?unmatched, "聚合层级在层级表中不存在，对应维度按原始粒度冲减");
        }
        lifter
    }

    pub fn is_active(&self) -> bool {
        self.item.is_some() || self.location.is_some() || self.customer.is_some() || self.time.is_some()
    }

    /// 某维度的聚合列名（None 表示保持原始粒度）
    pub fn aggregate_column(&self, dim: Dimension) -> Option<&str> {
        self.slot(dim).map(|l| l.column.as_str())
    }

    /// 原始坐标 → 聚合坐标（无映射的值保持不变）
    pub fn lift(&self, coord: &Coord) -> Coord {
        Coord {
            item: lift_value(self.item.as_ref(), &coord.item),
            location: lift_value(self.location.as_ref(), &coord.location),
            customer: lift_value(self.customer.as_ref(), &coord.customer),
            time: lift_value(self.time.as_ref(), &coord.time),
        }
    }

    /// 只提升时间桶
    pub fn lift_time(&self, time: &str) -> String {
        lift_value(self.time.as_ref(), time)
    }

    fn slot(&self, dim: Dimension) -> Option<&DimensionLift> {
        match dim {
            Dimension::Item => self.item.as_ref(),
            Dimension::Location => self.location.as_ref(),
            Dimension::Customer => self.customer.as_ref(),
            Dimension::Time => self.time.as_ref(),
        }
    }
}

fn lift_value(lift: Option<&DimensionLift>, value: &str) -> String {
    lift.and_then(|l| l.mapping.get(value))
        .cloned()
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> (Table, Table, Table, Table) {
        let item = Table::from_rows(
            vec!["Item", "Product Line", "Brand"],
            vec![vec!["A1", "PL1", "B1"], vec!["A2", "PL1", "B1"], vec!["A3", "PL2", "B1"]],
        );
        let location = Table::from_rows(vec!["Location", "Region"], vec![vec!["L1", "R1"]]);
        (item, location, Table::default(), Table::default())
    }

    #[test]
    fn test_lift_configured_dimensions_only() {
        let (item, location, customer, time) = tables();
        let config = NettingConfig {
            use_aggregate: true,
            aggregate_levels: vec!["Product Line".to_string()],
            ..Default::default()
        };
        let lifter = AggregateLifter::build(&config, [&item, &location, &customer, &time]);

        assert!(lifter.is_active());
        assert_eq!(lifter.aggregate_column(Dimension::Item), Some("Product Line"));
        assert_eq!(lifter.aggregate_column(Dimension::Location), None);
        assert_eq!(
            lifter.lift(&Coord::new("A2", "L1", "C1", "W1")),
            Coord::new("PL1", "L1", "C1", "W1")
        );
        // 无映射的值保持原样
        assert_eq!(lifter.lift(&Coord::new("Z9", "L1", "C1", "W1")).item, "Z9");
    }

    #[test]
    fn test_unknown_level_is_ignored() {
        let (item, location, customer, time) = tables();
        let config = NettingConfig {
            aggregate_levels: vec!["Planet".to_string()],
            ..Default::default()
        };
        let lifter = AggregateLifter::build(&config, [&item, &location, &customer, &time]);
        assert!(!lifter.is_active());
    }
}
