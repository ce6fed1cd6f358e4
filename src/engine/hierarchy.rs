// ==========================================
// 需求冲减引擎 - 层级索引 (Hierarchy Index)
// ==========================================
// 职责: 每个维度一棵树,叶子 → 各层祖先,(层级, 祖先) → 子叶子
// 约束: 只保留需求/供应中实际出现的叶子
// 红线: 祖先缺失不是错误,仅停止向上扩展
// ==========================================

use crate::domain::table::Table;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    // 叶子 → [第1层祖先, 第2层祖先, ...]
    ancestors: HashMap<String, Vec<String>>,
    // (层级, 祖先) → 子叶子（已去重、排序）
    children: HashMap<(usize, String), Vec<String>>,
    // 可作为兄弟返回的叶子范围（供应侧出现过的值）
    universe: HashSet<String>,
}

impl HierarchyIndex {
    /// 构建层级索引
    ///
    /// # 参数
    /// - table: 维度主数据表，列顺序为叶子 → 根
    /// - leaf_column: 冲减属性所在列（该列为第 0 层）
    /// - observed: 需求/供应中出现过的叶子，其余行忽略
    /// - universe: 兄弟查询可返回的叶子范围
    pub fn build(
        table: &Table,
        leaf_column: &str,
        observed: &HashSet<String>,
        universe: HashSet<String>,
    ) -> Self {
        let mut index = HierarchyIndex {
            universe,
            ..Default::default()
        };

        let leaf_pos = match table.column_index(leaf_column) {
            Some(pos) => pos,
            None => {
                if !table.columns.is_empty() {
                    warn!(column = leaf_column, "层级表缺少冲减属性列，不做层级扩展");
                }
                return index;
            }
        };
        if table.is_empty() {
            warn!(column = leaf_column, "层级主数据为空，不做层级扩展");
            return index;
        }

        let depth = table.columns.len() - leaf_pos;
        let mut seen_children: HashSet<(usize, String, String)> = HashSet::new();

        for row in 0..table.len() {
            let leaf = table.cell(row, leaf_pos);
            if leaf.is_empty() || !observed.contains(leaf) {
                continue;
            }

            let mut chain = Vec::with_capacity(depth.saturating_sub(1));
            for level in 1..depth {
                let ancestor = table.cell(row, leaf_pos + level);
                if ancestor.is_empty() {
                    break;
                }
                chain.push(ancestor.to_string());
                if seen_children.insert((level, ancestor.to_string(), leaf.to_string())) {
                    index
                        .children
                        .entry((level, ancestor.to_string()))
                        .or_default()
                        .push(leaf.to_string());
                }
            }
            index.ancestors.entry(leaf.to_string()).or_insert(chain);
        }

        for leaves in index.children.values_mut() {
            leaves.sort();
        }

        debug!(
            column = leaf_column,
            leaves = index.ancestors.len(),
            nodes = index.children.len(),
            "层级索引构建完成"
        );
        index
    }

    /// 第 level 层祖先（level ≥ 1）
    pub fn ancestor(&self, leaf: &str, level: usize) -> Option<&str> {
        if level == 0 {
            return None;
        }
        self.ancestors
            .get(leaf)
            .and_then(|chain| chain.get(level - 1))
            .map(String::as_str)
    }

    /// 兄弟序列：先叶子本身，再逐层追加祖先下属于范围内且未出现过的子叶子
    pub fn siblings(&self, leaf: &str, level: usize) -> Vec<String> {
        let mut result = vec![leaf.to_string()];
        if level == 0 {
            return result;
        }

        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(leaf);
        for lvl in 1..=level {
            let ancestor = match self.ancestor(leaf, lvl) {
                Some(a) => a,
                None => break,
            };
            if let Some(children) = self.children.get(&(lvl, ancestor.to_string())) {
                for child in children {
                    if self.universe.contains(child) && seen.insert(child.as_str()) {
                        result.push(child.clone());
                    }
                }
            }
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.ancestors.is_empty()
    }
}

// ==========================================
// 四个维度的层级索引集合
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct HierarchySet {
    pub item: HierarchyIndex,
    pub location: HierarchyIndex,
    pub customer: HierarchyIndex,
    pub time: HierarchyIndex,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_table() -> Table {
        Table::from_rows(
            vec!["Item", "Product Line", "Brand"],
            vec![
                vec!["A1", "PL1", "B1"],
                vec!["A2", "PL1", "B1"],
                vec!["A3", "PL2", "B1"],
                vec!["A4", "", "B2"],
                vec!["A9", "PL1", "B1"],
            ],
        )
    }

    fn set(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_siblings_walk_levels_in_order() {
        let observed = set(&["A1", "A2", "A3", "A4"]);
        let index = HierarchyIndex::build(&item_table(), "Item", &observed, observed.clone());

        assert_eq!(index.siblings("A1", 0), vec!["A1"]);
        assert_eq!(index.siblings("A1", 1), vec!["A1", "A2"]);
        assert_eq!(index.siblings("A1", 2), vec!["A1", "A2", "A3"]);
        // A9 未出现在需求/供应中，不会被返回
        assert!(!index.siblings("A2", 2).contains(&"A9".to_string()));
    }

    #[test]
    fn test_missing_ancestor_stops_expansion() {
        let observed = set(&["A1", "A4"]);
        let index = HierarchyIndex::build(&item_table(), "Item", &observed, observed.clone());
        assert_eq!(index.ancestor("A4", 1), None);
        assert_eq!(index.siblings("A4", 2), vec!["A4"]);
    }

    #[test]
    fn test_siblings_restricted_to_universe() {
        let observed = set(&["A1", "A2", "A3"]);
        let universe = set(&["A3"]);
        let index = HierarchyIndex::build(&item_table(), "Item", &observed, universe);
        assert_eq!(index.siblings("A1", 2), vec!["A1", "A3"]);
    }

    #[test]
    fn test_empty_table_degrades_to_leaf() {
        let index = HierarchyIndex::build(&Table::default(), "Item", &set(&["A1"]), set(&["A1"]));
        assert!(index.is_empty());
        assert_eq!(index.siblings("A1", 3), vec!["A1"]);
    }
}
