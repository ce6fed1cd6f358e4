// ==========================================
// 需求冲减引擎 - 配置层
// ==========================================
// 职责: 参数解析为强类型配置,列名管理
// 来源: 扁平参数表 (parameters.json / 调用方传入的 Map)
// ==========================================

pub mod column_names;
pub mod netting_config;
pub mod parameter_source;

// 重导出核心配置
pub use column_names::{BucketColumns, ColumnNames};
pub use netting_config::{config_keys, NettingConfig, ProfilingConfig};
pub use parameter_source::ParameterSource;
