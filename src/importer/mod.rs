// ==========================================
// 需求冲减引擎 - 导入层
// ==========================================
// 职责: 读取输入目录中的 CSV / JSON 文件,绑定为强类型记录;
//       把冲减结果写回 CSV
// ==========================================

pub mod error;
pub mod file_parser;
pub mod input_loader;
pub mod schema_binder;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvTableParser, TableParser};
pub use input_loader::{file_names, load_parameters, parse_parameters, InputLoader, OutputWriter};
pub use schema_binder::{bind_inputs, BoundInputs};
