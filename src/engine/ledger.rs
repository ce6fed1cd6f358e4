// ==========================================
// 需求冲减引擎 - 分配台账 (Allocation Ledger)
// ==========================================
// 职责: 持有一轮冲减中需求/供应的剩余数量,执行贪心匹配
// 规则: 按候选顺序依次消耗,先到先得,不回溯
// 性能: 已耗尽供应放入快速"空集",需求满足即提前退出
// ==========================================

use crate::domain::records::Coord;
use crate::perf;
use std::collections::HashMap;

/// Pegging 边：需求下标 → 供应下标，转移数量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PegEdge {
    pub demand: usize,
    pub supply: usize,
    pub quantity: f64,
}

/// 一轮冲减结束后交回的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerOutcome {
    pub demand_remaining: Vec<f64>,
    pub supply_remaining: Vec<f64>,
    pub pegging: Vec<PegEdge>,
    pub transfers: usize,
}

#[derive(Debug, Clone)]
pub struct AllocationLedger {
    demand_remaining: Vec<f64>,
    supply_remaining: Vec<f64>,
    exhausted: Vec<bool>, // 供应"空集"
    pegging: Option<Vec<PegEdge>>,
    transfers: usize,
}

impl AllocationLedger {
    /// 创建台账（负数剩余量按 0 处理）
    pub fn new(demand_remaining: Vec<f64>, supply_remaining: Vec<f64>, pegging: bool) -> Self {
        let demand_remaining: Vec<f64> = demand_remaining.into_iter().map(|q| q.max(0.0)).collect();
        let supply_remaining: Vec<f64> = supply_remaining.into_iter().map(|q| q.max(0.0)).collect();
        let exhausted = supply_remaining.iter().map(|&q| q <= 0.0).collect();
        Self {
            demand_remaining,
            supply_remaining,
            exhausted,
            pegging: if pegging { Some(Vec::new()) } else { None },
            transfers: 0,
        }
    }

    /// 按候选顺序为一行需求消耗供应
    ///
    /// # 参数
    /// - demand: 需求下标
    /// - candidates: 有序供应下标
    ///
    /// # 返回
    /// - true: 需求已完全满足
    pub fn consume(&mut self, demand: usize, candidates: &[usize]) -> bool {
        if self.demand_remaining[demand] <= 0.0 {
            return true;
        }

        for &supply in candidates {
            if self.exhausted[supply] {
                continue;
            }
            let available = self.supply_remaining[supply];
            if available <= 0.0 {
                self.exhausted[supply] = true;
                continue;
            }

            let quantity = self.demand_remaining[demand].min(available);
            self.demand_remaining[demand] -= quantity;
            self.supply_remaining[supply] -= quantity;
            self.transfers += 1;
            perf::record_transfer();

            if let Some(edges) = self.pegging.as_mut() {
                edges.push(PegEdge {
                    demand,
                    supply,
                    quantity,
                });
            }
            if self.supply_remaining[supply] <= 0.0 {
                self.exhausted[supply] = true;
            }
            if self.demand_remaining[demand] <= 0.0 {
                return true;
            }
        }
        false
    }

    pub fn demand_remaining(&self, demand: usize) -> f64 {
        self.demand_remaining[demand]
    }

    pub fn supply_remaining(&self, supply: usize) -> f64 {
        self.supply_remaining[supply]
    }

    pub fn is_exhausted(&self, supply: usize) -> bool {
        self.exhausted[supply]
    }

    /// 交回剩余量与 pegging 边
    pub fn into_outcome(self) -> LedgerOutcome {
        LedgerOutcome {
            demand_remaining: self.demand_remaining,
            supply_remaining: self.supply_remaining,
            pegging: self.pegging.unwrap_or_default(),
            transfers: self.transfers,
        }
    }
}

// ==========================================
// 供应坐标索引
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SupplyIndex {
    by_coord: HashMap<Coord, usize>,
}

impl SupplyIndex {
    /// 按坐标建立索引（重复坐标保留第一行）
    pub fn build<'a, I>(coords: I) -> Self
    where
        I: IntoIterator<Item = &'a Coord>,
    {
        let mut by_coord = HashMap::new();
        for (i, coord) in coords.into_iter().enumerate() {
            by_coord.entry(coord.clone()).or_insert(i);
        }
        Self { by_coord }
    }

    pub fn get(&self, coord: &Coord) -> Option<usize> {
        self.by_coord.get(coord).copied()
    }

    /// 候选坐标 → 存在的供应下标（保持顺序）
    pub fn lookup(&self, tuples: &[Coord]) -> Vec<usize> {
        tuples.iter().filter_map(|c| self.get(c)).collect()
    }

    pub fn len(&self) -> usize {
        self.by_coord.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_coord.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_in_candidate_order() {
        let mut ledger = AllocationLedger::new(vec![15.0], vec![10.0, 10.0], true);
        assert!(ledger.consume(0, &[0, 1]));
        assert_eq!(ledger.supply_remaining(0), 0.0);
        assert_eq!(ledger.supply_remaining(1), 5.0);

        let outcome = ledger.into_outcome();
        assert_eq!(outcome.demand_remaining, vec![0.0]);
        assert_eq!(outcome.pegging.len(), 2);
        assert_eq!(outcome.pegging[0].quantity, 10.0);
        assert_eq!(outcome.pegging[1].quantity, 5.0);
    }

    #[test]
    fn test_exhausted_supply_skipped_without_transfer() {
        let mut ledger = AllocationLedger::new(vec![4.0], vec![0.0, 6.0], true);
        assert!(ledger.is_exhausted(0));
        assert!(ledger.consume(0, &[0, 1]));
        let outcome = ledger.into_outcome();
        assert_eq!(outcome.transfers, 1);
        assert_eq!(outcome.pegging[0].supply, 1);
        assert_eq!(outcome.supply_remaining, vec![0.0, 2.0]);
    }

    #[test]
    fn test_partial_fill_returns_false() {
        let mut ledger = AllocationLedger::new(vec![20.0], vec![5.0], false);
        assert!(!ledger.consume(0, &[0]));
        assert_eq!(ledger.demand_remaining(0), 15.0);
        assert!(ledger.is_exhausted(0));
        assert!(ledger.into_outcome().pegging.is_empty());
    }

    #[test]
    fn test_zero_demand_is_satisfied() {
        let mut ledger = AllocationLedger::new(vec![0.0], vec![5.0], true);
        assert!(ledger.consume(0, &[0]));
        assert_eq!(ledger.supply_remaining(0), 5.0);
    }

    #[test]
    fn test_supply_index_lookup_preserves_order() {
        let coords = vec![
            Coord::new("A", "L", "C", "W1"),
            Coord::new("A", "L", "C", "W2"),
        ];
        let index = SupplyIndex::build(&coords);
        let tuples = vec![
            Coord::new("A", "L", "C", "W2"),
            Coord::new("X", "L", "C", "W1"),
            Coord::new("A", "L", "C", "W1"),
        ];
        assert_eq!(index.lookup(&tuples), vec![1, 0]);
    }
}
