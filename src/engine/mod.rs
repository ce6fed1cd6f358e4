// ==========================================
// 需求冲减引擎 - 引擎层
// ==========================================
// 职责: 层级索引、消耗元组、分配台账、各轮冲减、需求类型划分与画像
// 红线: 引擎不读写文件,所有输入经导入层绑定后传入
// ==========================================

pub mod aggregate;
pub mod assembler;
pub mod bucket_resolver;
pub mod classifier;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod horizon;
pub mod ledger;
pub mod orchestrator;
pub mod priority;
pub mod profiling;
pub mod stream;
pub mod tuple_generator;
pub mod workspace;

// 重导出核心引擎
pub use aggregate::AggregateLifter;
pub use assembler::{assemble_demand_types, assemble_pegging, round_quantity};
pub use bucket_resolver::{parse_date, BucketResolver};
pub use classifier::DemandTypeClassifier;
pub use error::{NettingError, NettingResult};
pub use graph::{AssociationGraph, AssociationKind};
pub use hierarchy::{HierarchyIndex, HierarchySet};
pub use horizon::{HorizonSplit, HorizonSplitter};
pub use ledger::{AllocationLedger, LedgerOutcome, PegEdge, SupplyIndex};
pub use orchestrator::NettingOrchestrator;
pub use priority::DemandPrioritySorter;
pub use profiling::ProfilingRedistributor;
pub use stream::{ForecastStreamDescriptor, OrderStreamDescriptor, StreamManager};
pub use tuple_generator::{validate_consumption_order, ConsumptionTupleGenerator, TupleMode};
