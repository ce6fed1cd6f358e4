// ==========================================
// 需求冲减引擎 - 原始输入表
// ==========================================
// 职责: 以列名标识的字符串表格,作为导入层与绑定层之间的载体
// 约定: 缺失单元格一律视为空字符串
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 按列名列表与行数据构造
    pub fn from_rows<C, R, S>(columns: C, rows: R) -> Self
    where
        C: IntoIterator<Item = S>,
        R: IntoIterator<Item = Vec<S>>,
        S: Into<String>,
    {
        let mut table = Table::new(columns.into_iter().map(Into::into).collect());
        for row in rows {
            table.push_row(row.into_iter().map(Into::into).collect());
        }
        table
    }

    /// 追加一行，长度按列数补齐或截断
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// 读取单元格（越界返回空字符串）
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    /// 按列名读取单元格
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        self.column_index(column).map(|col| self.cell(row, col))
    }

    /// 某列所有非空值（保持出现顺序，不去重）
    pub fn column_values(&self, column: &str) -> Vec<&str> {
        match self.column_index(column) {
            Some(col) => (0..self.len())
                .map(|r| self.cell(r, col))
                .filter(|v| !v.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_pads_missing_cells() {
        let mut table = Table::new(vec!["A".into(), "B".into()]);
        table.push_row(vec!["1".into()]);
        assert_eq!(table.cell(0, 1), "");
        assert_eq!(table.value(0, "A"), Some("1"));
        assert_eq!(table.value(0, "C"), None);
    }

    #[test]
    fn test_column_values_skip_blank() {
        let table = Table::from_rows(vec!["A"], vec![vec!["x"], vec![" "], vec!["y"]]);
        assert_eq!(table.column_values("A"), vec!["x", "y"]);
    }
}
