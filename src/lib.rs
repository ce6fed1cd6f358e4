// ==========================================
// 需求冲减引擎 - 核心库
// ==========================================
// 订单/预测/RTF 供应冲减,按流拆分需求类型,
// 可选聚合冲减、关联图冲减与时间画像
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 输入表、记录与输出行
pub mod domain;

// 引擎层 - 冲减规则
pub mod engine;

// 导入层 - 文件读写与结构绑定
pub mod importer;

// 配置层 - 参数解析
pub mod config;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{NettingConfig, ParameterSource};
pub use domain::{DemandTypeRow, NettingInputs, NettingOutput, NettingStage, PeggingRow, Table};
pub use engine::{NettingError, NettingOrchestrator, NettingResult};
pub use importer::{InputLoader, OutputWriter};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "需求冲减引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
