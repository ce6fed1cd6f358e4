// ==========================================
// 需求冲减引擎 - 领域模型层
// ==========================================
// 职责: 定义输入表、冲减记录、流参数、输出行与枚举类型
// 红线: 不含文件读写,不含冲减逻辑
// ==========================================

pub mod inputs;
pub mod output;
pub mod records;
pub mod stream;
pub mod table;
pub mod types;

// 重导出核心类型
pub use inputs::NettingInputs;
pub use output::{DemandTypeKey, DemandTypeRow, NettingOutput, PeggingRow};
pub use records::{
    AssociationEdge, BucketParams, Coord, ForecastRecord, OrderRecord, SupplyRecord,
    UpwardLevels,
};
pub use stream::{ForecastStreamParam, OrderStreamParam};
pub use table::Table;
pub use types::{
    demand_types, BasisRoundingPolicy, Dimension, NettingStage, ProfileSpreadMethod, TimeGrain,
};
