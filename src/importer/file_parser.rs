// ==========================================
// 需求冲减引擎 - 文件解析器
// ==========================================
// 职责: 把 CSV 文件读成以列名标识的 Table
// 约定: 表头与单元格去首尾空白,完全空白的行跳过
// ==========================================

use crate::domain::table::Table;
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

// ==========================================
// TableParser Trait
// ==========================================
pub trait TableParser: Send + Sync {
    /// 解析文件为 Table
    ///
    /// # 参数
    /// - file_path: 文件路径
    ///
    /// # 返回
    /// - Err(FileNotFound): 文件不存在
    /// - Err(CsvParseError): 格式错误
    fn parse_table(&self, file_path: &Path) -> ImportResult<Table>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvTableParser;

impl CsvTableParser {
    /// 从任意读取器解析（测试与内存数据使用）
    pub fn parse_reader<R: Read>(&self, reader: R) -> ImportResult<Table> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(reader);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut table = Table::new(headers);

        // 读取所有行
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            // 跳过完全空白的行
            if row.iter().all(|v| v.is_empty()) {
                continue;
            }
            table.push_row(row);
        }
        Ok(table)
    }
}

impl TableParser for CsvTableParser {
    fn parse_table(&self, file_path: &Path) -> ImportResult<Table> {
        // 检查文件存在
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        // 检查扩展名
        if let Some(ext) = file_path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(ImportError::UnsupportedFormat(ext.to_string_lossy().to_string()));
            }
        }

        let file = File::open(file_path)?;
        let table = self.parse_reader(file)?;
        debug!(file = %file_path.display(), rows = table.len(), columns = table.columns.len(), "CSV 读取完成");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_skips_blank_rows() {
        let data = " Item , Week ,Order Quantity\nA1, 2024-01-01 ,10\n,,\nA2,2024-01-08\n";
        let table = CsvTableParser.parse_reader(data.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["Item", "Week", "Order Quantity"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "Week"), Some("2024-01-01"));
        // 短行补齐为空
        assert_eq!(table.value(1, "Order Quantity"), Some(""));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = CsvTableParser
            .parse_table(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
