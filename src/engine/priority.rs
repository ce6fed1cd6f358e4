// ==========================================
// 需求冲减引擎 - 冲减优先级排序
// ==========================================
// 职责: 决定每轮冲减中需求行的处理顺序
// 排序键:
// 1) 订单优先级升序（只要有一行带优先级就启用，缺失按 max+1）
// 2) 时间优先级升序（伪订单在 RTF 阶段加偏移）
// 3) 需求号
// 4) 冲减坐标
// ==========================================

use crate::engine::workspace::DemandRow;
use std::cmp::Ordering;
use std::collections::HashSet;

// ==========================================
// DemandPrioritySorter - 需求排序引擎
// ==========================================
pub struct DemandPrioritySorter {
    // 无状态引擎,不需要注入依赖
}

impl Default for DemandPrioritySorter {
    fn default() -> Self {
        Self::new()
    }
}

impl DemandPrioritySorter {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 订单 ↔ 预测冲减顺序
    ///
    /// # 参数
    /// - `rows`: 需求行全集
    /// - `selection`: 参与本轮的需求行下标
    ///
    /// # 返回
    /// 排序后的下标
    pub fn sort_for_forecast(&self, rows: &[DemandRow], mut selection: Vec<usize>) -> Vec<usize> {
        let missing = Self::missing_priority(rows, &selection);
        selection.sort_by(|&a, &b| self.compare(&rows[a], &rows[b], missing, 0.0, 0.0));
        selection
    }

    /// RTF 冲减顺序：需求号属于默认预测需求号的行加时间偏移
    ///
    /// # 参数
    /// - `pseudo_ids`: 默认预测需求号集合
    /// - `offset`: 伪订单的时间优先级偏移
    pub fn sort_for_rtf(
        &self,
        rows: &[DemandRow],
        mut selection: Vec<usize>,
        pseudo_ids: &HashSet<&str>,
        offset: f64,
    ) -> Vec<usize> {
        let missing = Self::missing_priority(rows, &selection);
        selection.sort_by(|&a, &b| {
            let ra = &rows[a];
            let rb = &rows[b];
            let oa = if pseudo_ids.contains(ra.demand_id.as_str()) { offset } else { 0.0 };
            let ob = if pseudo_ids.contains(rb.demand_id.as_str()) { offset } else { 0.0 };
            self.compare(ra, rb, missing, oa, ob)
        });
        selection
    }

    /// 全部行的最大时间优先级
    pub fn max_time_priority(rows: &[DemandRow], selection: &[usize]) -> f64 {
        selection
            .iter()
            .map(|&i| rows[i].time_priority)
            .fold(0.0, f64::max)
    }

    // ==========================================
    // 内部比较
    // ==========================================

    /// 缺失优先级的替代值：None 表示所有行都没有优先级
    fn missing_priority(rows: &[DemandRow], selection: &[usize]) -> Option<f64> {
        selection
            .iter()
            .filter_map(|&i| rows[i].priority)
            .reduce(f64::max)
            .map(|max| max + 1.0)
    }

    fn compare(
        &self,
        a: &DemandRow,
        b: &DemandRow,
        missing: Option<f64>,
        offset_a: f64,
        offset_b: f64,
    ) -> Ordering {
        if let Some(missing) = missing {
            let pa = a.priority.unwrap_or(missing);
            let pb = b.priority.unwrap_or(missing);
            let ord = pa.total_cmp(&pb);
            if ord != Ordering::Equal {
                return ord;
            }
        }

        (a.time_priority + offset_a)
            .total_cmp(&(b.time_priority + offset_b))
            .then_with(|| a.demand_id.cmp(&b.demand_id))
            .then_with(|| a.netting.cmp(&b.netting))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::{BucketParams, Coord};
    use crate::engine::workspace::DemandOrigin;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn row(id: &str, priority: Option<f64>, time_priority: f64) -> DemandRow {
        DemandRow {
            version: "CW".to_string(),
            demand_id: id.to_string(),
            native: Coord::new("A", "L", "C", "W1"),
            netting: Coord::new("A", "L", "C", "W1"),
            origin: DemandOrigin::Order { stream: 0 },
            open_quantity: 1.0,
            priority,
            time_priority,
            params: BucketParams::default(),
            exclude_netting: false,
            exclude_planning: false,
            rtf_eligible: true,
            due_date: None,
            remaining: 1.0,
            consumed_by_stream: vec![0.0],
            covered_by_rtf: 0.0,
        }
    }

    #[test]
    fn test_explicit_priority_first_missing_last() {
        let rows = vec![
            row("O1", None, 0.0),
            row("O2", Some(2.0), 5.0),
            row("O3", Some(1.0), 9.0),
        ];
        let sorter = DemandPrioritySorter::new();
        assert_eq!(sorter.sort_for_forecast(&rows, vec![0, 1, 2]), vec![2, 1, 0]);
    }

    #[test]
    fn test_time_then_id_when_no_priority() {
        let rows = vec![
            row("O2", None, 1.0),
            row("O1", None, 1.0),
            row("O0", None, 3.0),
        ];
        let sorter = DemandPrioritySorter::new();
        assert_eq!(sorter.sort_for_forecast(&rows, vec![0, 1, 2]), vec![1, 0, 2]);
    }

    #[test]
    fn test_rtf_pushes_pseudo_orders_after_real_orders() {
        let rows = vec![
            row("NetBaseForecast", None, 0.0),
            row("O1", None, 2.0),
        ];
        let sorter = DemandPrioritySorter::new();
        let ids: HashSet<&str> = ["NetBaseForecast"].into_iter().collect();
        let max = DemandPrioritySorter::max_time_priority(&rows, &[0, 1]);

        assert_eq!(sorter.sort_for_rtf(&rows, vec![0, 1], &ids, max + 1.0), vec![1, 0]);
        // 按时间优先时，伪订单只排在同一时间桶订单之后
        assert_eq!(sorter.sort_for_rtf(&rows, vec![0, 1], &ids, 0.1), vec![0, 1]);
    }
}
