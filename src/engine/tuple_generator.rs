// ==========================================
// 需求冲减引擎 - 消耗元组生成器 (Consumption-Tuple Generator)
// ==========================================
// 职责: 为一行需求生成有序、去重的候选坐标 (item, location, customer, time)
// 模式:
// - 层级模式: 标签 I/L/S/T,时间按时间层级取兄弟
// - 前后模式: 标签 I/L/S/B/F,向前序列与向后序列分别生成后拼接
// 约束: 消耗顺序字符串必须属于预计算的合法排列表
// ==========================================

use crate::config::NettingConfig;
use crate::domain::records::{BucketParams, Coord};
use crate::engine::bucket_resolver::BucketResolver;
use crate::engine::error::{NettingError, NettingResult};
use crate::engine::hierarchy::HierarchySet;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// 单行元组数告警阈值
pub const OVERSIZE_TUPLE_THRESHOLD: usize = 10_000;

/// 每次运行最多输出的超大元组告警条数
const MAX_OVERSIZE_WARNINGS: usize = 10;

// ==========================================
// 元组模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupleMode {
    Hierarchical,    // 时间层级
    BackwardForward, // 向前/向后桶
}

impl fmt::Display for TupleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TupleMode::Hierarchical => write!(f, "HIERARCHICAL"),
            TupleMode::BackwardForward => write!(f, "BACKWARD_FORWARD"),
        }
    }
}

// ==========================================
// 合法排列表（只计算一次）
// ==========================================

fn permutations(tags: &[char]) -> Vec<String> {
    if tags.len() <= 1 {
        return vec![tags.iter().collect()];
    }
    let mut result = Vec::new();
    for i in 0..tags.len() {
        let mut rest = tags.to_vec();
        let head = rest.remove(i);
        for tail in permutations(&rest) {
            let mut s = String::with_capacity(tags.len());
            s.push(head);
            s.push_str(&tail);
            result.push(s);
        }
    }
    result
}

fn valid_orders(mode: TupleMode) -> &'static HashSet<String> {
    static HIERARCHICAL: OnceLock<HashSet<String>> = OnceLock::new();
    static BACKWARD_FORWARD: OnceLock<HashSet<String>> = OnceLock::new();
    match mode {
        TupleMode::Hierarchical => {
            HIERARCHICAL.get_or_init(|| permutations(&['I', 'L', 'S', 'T']).into_iter().collect())
        }
        TupleMode::BackwardForward => BACKWARD_FORWARD.get_or_init(|| {
            permutations(&['B', 'I', 'L', 'S', 'F'])
                .into_iter()
                .filter(|p| p.find('B') < p.find('F'))
                .collect()
        }),
    }
}

/// 校验消耗顺序字符串
///
/// # 返回
/// - Err(InvalidConsumptionOrder): 不是当前标签集的合法排列，或 F 在 B 之前
pub fn validate_consumption_order(mode: TupleMode, order: &str) -> NettingResult<()> {
    if valid_orders(mode).contains(order) {
        Ok(())
    } else {
        Err(NettingError::InvalidConsumptionOrder {
            mode: mode.to_string(),
            value: order.to_string(),
        })
    }
}

/// 标签 → 维度下标 (0=item, 1=location, 2=customer, 3=time)
fn tag_to_dimension(tag: char) -> usize {
    match tag {
        'I' => 0,
        'L' => 1,
        'S' => 2,
        _ => 3, // T / B / F 都对应时间维度
    }
}

/// 去掉一个标签后的循环顺序
fn loop_order(order: &str, drop: Option<char>) -> [usize; 4] {
    let mut dims = [0usize; 4];
    let tags: Vec<char> = order.chars().filter(|c| Some(*c) != drop).collect();
    for (slot, tag) in dims.iter_mut().zip(tags) {
        *slot = tag_to_dimension(tag);
    }
    dims
}

// ==========================================
// 生成器
// ==========================================
pub struct ConsumptionTupleGenerator<'a> {
    hierarchies: &'a HierarchySet,
    buckets: &'a BucketResolver,
    mode: TupleMode,
    primary_order: [usize; 4],   // 层级模式 / 向前序列
    forward_order: [usize; 4],   // 向后序列
    disable_buckets: bool,
    oversize_warnings: usize,
    oversize_suppressed: usize,
}

impl<'a> ConsumptionTupleGenerator<'a> {
    pub fn new(
        hierarchies: &'a HierarchySet,
        buckets: &'a BucketResolver,
        config: &NettingConfig,
    ) -> NettingResult<Self> {
        let mode = config.tuple_mode();
        let order = config.active_consumption_order();
        validate_consumption_order(mode, order)?;

        let (primary_order, forward_order) = match mode {
            TupleMode::Hierarchical => (loop_order(order, None), loop_order(order, None)),
            TupleMode::BackwardForward => (loop_order(order, Some('F')), loop_order(order, Some('B'))),
        };

        Ok(Self {
            hierarchies,
            buckets,
            mode,
            primary_order,
            forward_order,
            disable_buckets: config.disable_buckets,
            oversize_warnings: 0,
            oversize_suppressed: 0,
        })
    }

    /// 生成一行的候选坐标
    ///
    /// # 参数
    /// - coord: 冲减粒度坐标
    /// - params: 向前/向后桶数与向上层级
    /// - row_label: 超大告警中标识该行
    pub fn generate(&mut self, coord: &Coord, params: &BucketParams, row_label: &str) -> Vec<Coord> {
        if self.disable_buckets {
            return vec![coord.clone()];
        }

        let items = self.hierarchies.item.siblings(&coord.item, params.upward.item);
        let locations = self.hierarchies.location.siblings(&coord.location, params.upward.location);
        let customers = self.hierarchies.customer.siblings(&coord.customer, params.upward.customer);

        let mut seen: HashSet<Coord> = HashSet::new();
        let mut tuples = Vec::new();

        match self.mode {
            TupleMode::Hierarchical => {
                let times = self.hierarchies.time.siblings(&coord.time, params.upward.time);
                form_tuples(
                    [&items, &locations, &customers, &times],
                    self.primary_order,
                    &mut seen,
                    &mut tuples,
                );
            }
            TupleMode::BackwardForward => {
                let backward: Vec<String> = self
                    .buckets
                    .backward(&coord.time, params.backward)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                let mut backward_window = Vec::with_capacity(backward.len() + 1);
                if self.buckets.backward_before_current() {
                    backward_window.extend(backward);
                    backward_window.push(coord.time.clone());
                } else {
                    backward_window.push(coord.time.clone());
                    backward_window.extend(backward);
                }
                let forward_window: Vec<String> = self
                    .buckets
                    .forward(&coord.time, params.forward)
                    .into_iter()
                    .map(str::to_string)
                    .collect();

                form_tuples(
                    [&items, &locations, &customers, &backward_window],
                    self.primary_order,
                    &mut seen,
                    &mut tuples,
                );
                form_tuples(
                    [&items, &locations, &customers, &forward_window],
                    self.forward_order,
                    &mut seen,
                    &mut tuples,
                );
            }
        }

        if tuples.len() >= OVERSIZE_TUPLE_THRESHOLD {
            if self.oversize_warnings < MAX_OVERSIZE_WARNINGS {
                warn!(row = row_label, tuples = tuples.len(), "消耗元组数量过大");
                self.oversize_warnings += 1;
            } else {
                self.oversize_suppressed += 1;
            }
        }
        tuples
    }

    /// 输出被抑制的超大告警汇总
    pub fn finish(&self) {
        if self.oversize_suppressed > 0 {
            warn!(
                suppressed = self.oversize_suppressed,
                "另有若干行消耗元组数量过大，告警已省略"
            );
        }
    }

    pub fn oversize_rows(&self) -> usize {
        self.oversize_warnings + self.oversize_suppressed
    }
}

/// 按循环顺序生成元组：order[3] 为最外层，order[0] 为最内层
fn form_tuples(
    lists: [&Vec<String>; 4],
    order: [usize; 4],
    seen: &mut HashSet<Coord>,
    out: &mut Vec<Coord>,
) {
    let [inner, second, third, outer] = order;
    for v3 in lists[outer] {
        for v2 in lists[third] {
            for v1 in lists[second] {
                for v0 in lists[inner] {
                    let mut values: [&str; 4] = [""; 4];
                    values[outer] = v3.as_str();
                    values[third] = v2.as_str();
                    values[second] = v1.as_str();
                    values[inner] = v0.as_str();
                    let coord = Coord::new(values[0], values[1], values[2], values[3]);
                    if !seen.contains(&coord) {
                        seen.insert(coord.clone());
                        out.push(coord);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::UpwardLevels;
    use crate::domain::table::Table;
    use crate::engine::hierarchy::HierarchyIndex;

    fn hierarchies() -> HierarchySet {
        let items = Table::from_rows(
            vec!["Item", "Brand"],
            vec![vec!["A1", "B1"], vec!["A2", "B1"]],
        );
        let all: HashSet<String> = ["A1", "A2"].iter().map(|s| s.to_string()).collect();
        HierarchySet {
            item: HierarchyIndex::build(&items, "Item", &all, all.clone()),
            ..Default::default()
        }
    }

    fn weeks() -> BucketResolver {
        BucketResolver::new(vec!["W1", "W2", "W3", "W4"])
    }

    #[test]
    fn test_valid_permutation_tables() {
        assert_eq!(valid_orders(TupleMode::Hierarchical).len(), 24);
        assert_eq!(valid_orders(TupleMode::BackwardForward).len(), 60);
        assert!(validate_consumption_order(TupleMode::BackwardForward, "ILSBF").is_ok());
        assert!(validate_consumption_order(TupleMode::BackwardForward, "ILSFB").is_err());
        assert!(validate_consumption_order(TupleMode::BackwardForward, "ILST").is_err());
        assert!(validate_consumption_order(TupleMode::Hierarchical, "TSLI").is_ok());
        assert!(validate_consumption_order(TupleMode::Hierarchical, "IILS").is_err());
    }

    #[test]
    fn test_backward_then_forward_sequence() {
        let h = hierarchies();
        let b = weeks();
        let config = NettingConfig::default();
        let mut generator = ConsumptionTupleGenerator::new(&h, &b, &config).unwrap();

        let params = BucketParams {
            backward: 1,
            forward: 1,
            upward: UpwardLevels::default(),
        };
        let tuples = generator.generate(&Coord::new("A1", "L1", "C1", "W3"), &params, "O1");
        let times: Vec<&str> = tuples.iter().map(|c| c.time.as_str()).collect();
        assert_eq!(times, vec!["W3", "W2", "W4"]);
    }

    #[test]
    fn test_item_varies_fastest_with_default_order() {
        let h = hierarchies();
        let b = weeks();
        let config = NettingConfig::default();
        let mut generator = ConsumptionTupleGenerator::new(&h, &b, &config).unwrap();

        let params = BucketParams {
            backward: 1,
            forward: 0,
            upward: UpwardLevels {
                item: 1,
                ..Default::default()
            },
        };
        let tuples = generator.generate(&Coord::new("A1", "L1", "C1", "W2"), &params, "O1");
        let keys: Vec<(String, String)> = tuples.iter().map(|c| (c.item.clone(), c.time.clone())).collect();
        assert_eq!(
            keys,
            vec![
                ("A1".to_string(), "W2".to_string()),
                ("A2".to_string(), "W2".to_string()),
                ("A1".to_string(), "W1".to_string()),
                ("A2".to_string(), "W1".to_string()),
            ]
        );
    }

    #[test]
    fn test_time_outermost_when_order_puts_time_first() {
        let h = hierarchies();
        let b = weeks();
        let config = NettingConfig {
            consumption_order: "BILSF".to_string(),
            ..Default::default()
        };
        let mut generator = ConsumptionTupleGenerator::new(&h, &b, &config).unwrap();
        let params = BucketParams {
            backward: 1,
            forward: 0,
            upward: UpwardLevels {
                item: 1,
                ..Default::default()
            },
        };
        let tuples = generator.generate(&Coord::new("A1", "L1", "C1", "W2"), &params, "O1");
        let keys: Vec<(&str, &str)> = tuples.iter().map(|c| (c.item.as_str(), c.time.as_str())).collect();
        assert_eq!(keys, vec![("A1", "W2"), ("A1", "W1"), ("A2", "W2"), ("A2", "W1")]);
    }

    #[test]
    fn test_disable_buckets_returns_own_coordinate() {
        let h = hierarchies();
        let b = weeks();
        let config = NettingConfig {
            disable_buckets: true,
            ..Default::default()
        };
        let mut generator = ConsumptionTupleGenerator::new(&h, &b, &config).unwrap();
        let coord = Coord::new("A1", "L1", "C1", "W2");
        let params = BucketParams {
            backward: 3,
            forward: 3,
            upward: UpwardLevels::default(),
        };
        assert_eq!(generator.generate(&coord, &params, "O1"), vec![coord]);
    }

    #[test]
    fn test_invalid_order_rejected_at_construction() {
        let h = hierarchies();
        let b = weeks();
        let config = NettingConfig {
            consumption_order: "FILSB".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ConsumptionTupleGenerator::new(&h, &b, &config),
            Err(NettingError::InvalidConsumptionOrder { .. })
        ));
    }
}
