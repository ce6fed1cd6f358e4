// ==========================================
// 需求冲减引擎 - 引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 仅配置/结构类错误为致命错误,且在任何冲减状态变更之前抛出
// ==========================================

use thiserror::Error;

/// 冲减引擎错误类型
#[derive(Error, Debug)]
pub enum NettingError {
    // ===== 输入结构错误 =====
    #[error("输入表 {table} 缺少必需列: {column}")]
    MissingColumn { table: String, column: String },

    #[error("订单与预测均为空，无法执行冲减")]
    EmptyInputs,

    #[error("数值格式错误 (表 {table}, 行 {row}, 列 {column}): {value}")]
    InvalidNumber {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("日期格式错误 (表 {table}): {value}")]
    InvalidDate { table: String, value: String },

    // ===== 配置错误 =====
    #[error("消耗顺序无效 ({mode}): {value}")]
    InvalidConsumptionOrder { mode: String, value: String },

    #[error("配置错误: {0}")]
    Config(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 冲减结果类型别名
pub type NettingResult<T> = Result<T, NettingError>;

impl NettingError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        NettingError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}
