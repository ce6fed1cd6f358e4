// ==========================================
// 需求冲减引擎 - 领域类型定义
// ==========================================
// 职责: 维度、时间粒度、冲减阶段、画像分摊方式等枚举
// 红线: 只含类型与解析,不含冲减逻辑
// ==========================================

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 维度 (Dimension)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    Item,     // 物料
    Location, // 地点
    Customer, // 客户 (Sales Domain)
    Time,     // 时间
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Item,
        Dimension::Location,
        Dimension::Customer,
        Dimension::Time,
    ];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Item => write!(f, "ITEM"),
            Dimension::Location => write!(f, "LOCATION"),
            Dimension::Customer => write!(f, "CUSTOMER"),
            Dimension::Time => write!(f, "TIME"),
        }
    }
}

// ==========================================
// 时间粒度 (Time Grain)
// ==========================================
// 用于订单展望期 (Order Horizon) 截止日计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeGrain {
    Day,   // 日
    Week,  // 周
    Month, // 月
}

impl TimeGrain {
    /// 解析粒度名称，无法识别时返回 None
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "day" | "days" | "d" => Some(TimeGrain::Day),
            "week" | "weeks" | "w" => Some(TimeGrain::Week),
            "month" | "months" | "m" => Some(TimeGrain::Month),
            _ => None,
        }
    }

    /// 在日期上增加 n 个粒度单位
    ///
    /// # 返回
    /// - None: 日期溢出
    pub fn add_units(&self, date: NaiveDate, units: u32) -> Option<NaiveDate> {
        match self {
            TimeGrain::Day => date.checked_add_signed(Duration::days(i64::from(units))),
            TimeGrain::Week => date.checked_add_signed(Duration::weeks(i64::from(units))),
            TimeGrain::Month => date.checked_add_months(Months::new(units)),
        }
    }
}

impl fmt::Display for TimeGrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeGrain::Day => write!(f, "DAY"),
            TimeGrain::Week => write!(f, "WEEK"),
            TimeGrain::Month => write!(f, "MONTH"),
        }
    }
}

// ==========================================
// 冲减阶段 (Netting Stage)
// ==========================================
// 编排器状态机:
// INIT → PREPROCESS → [AGGREGATE_LIFT] → NATIVE_NET → FORECAST_NET
//      → [GRAPH_NET | MULTISTREAM_SPLIT] → COMBINE → RTF_NET
//      → CLASSIFY → PROFILE → DONE
// 终止态: EARLY_EXIT (输入校验失败) / SKIP (全部跳过冲减)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NettingStage {
    Init,
    Preprocess,
    AggregateLift,
    NativeNet,
    ForecastNet,
    GraphNet,
    MultistreamSplit,
    Combine,
    RtfNet,
    Classify,
    Profile,
    Done,
    EarlyExit,
    Skip,
}

impl NettingStage {
    /// 是否为终止态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NettingStage::Done | NettingStage::EarlyExit | NettingStage::Skip
        )
    }
}

impl fmt::Display for NettingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NettingStage::Init => "INIT",
            NettingStage::Preprocess => "PREPROCESS",
            NettingStage::AggregateLift => "AGGREGATE_LIFT",
            NettingStage::NativeNet => "NATIVE_NET",
            NettingStage::ForecastNet => "FORECAST_NET",
            NettingStage::GraphNet => "GRAPH_NET",
            NettingStage::MultistreamSplit => "MULTISTREAM_SPLIT",
            NettingStage::Combine => "COMBINE",
            NettingStage::RtfNet => "RTF_NET",
            NettingStage::Classify => "CLASSIFY",
            NettingStage::Profile => "PROFILE",
            NettingStage::Done => "DONE",
            NettingStage::EarlyExit => "EARLY_EXIT",
            NettingStage::Skip => "SKIP",
        };
        write!(f, "{}", name)
    }
}

// ==========================================
// 画像分摊方式 (Profiling Spread Method)
// ==========================================
// 从展示时间粒度映射到最终输出时间粒度时使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileSpreadMethod {
    ByBasis,     // 按基准表比例
    EqualSpread, // 平均分摊
    LastBucket,  // 放在最后一个桶
    FirstBucket, // 放在第一个桶 (默认)
}

impl ProfileSpreadMethod {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "by basis" => ProfileSpreadMethod::ByBasis,
            "equal spread" => ProfileSpreadMethod::EqualSpread,
            "last bucket" => ProfileSpreadMethod::LastBucket,
            _ => ProfileSpreadMethod::FirstBucket,
        }
    }
}

impl fmt::Display for ProfileSpreadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileSpreadMethod::ByBasis => write!(f, "By Basis"),
            ProfileSpreadMethod::EqualSpread => write!(f, "Equal Spread"),
            ProfileSpreadMethod::LastBucket => write!(f, "Last Bucket"),
            ProfileSpreadMethod::FirstBucket => write!(f, "First Bucket"),
        }
    }
}

// ==========================================
// 基准取整策略 (Basis Rounding Policy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BasisRoundingPolicy {
    Distribute,   // 整数精确分配，组内总量守恒
    RoundUp,      // 向上取整
    RoundDown,    // 向下取整
    Proportional, // 按比例 (可能为小数)
}

impl BasisRoundingPolicy {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "distribute" => BasisRoundingPolicy::Distribute,
            "round up" => BasisRoundingPolicy::RoundUp,
            "round down" => BasisRoundingPolicy::RoundDown,
            _ => BasisRoundingPolicy::Proportional,
        }
    }
}

impl fmt::Display for BasisRoundingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasisRoundingPolicy::Distribute => write!(f, "Distribute"),
            BasisRoundingPolicy::RoundUp => write!(f, "Round Up"),
            BasisRoundingPolicy::RoundDown => write!(f, "Round Down"),
            BasisRoundingPolicy::Proportional => write!(f, "Proportional"),
        }
    }
}

// ==========================================
// 需求类型标签 (默认值)
// ==========================================
pub mod demand_types {
    // 订单
    pub const COM_ORDER: &str = "COM_ORDER"; // 已被 RTF 覆盖
    pub const NEW_ORDER: &str = "NEW_ORDER"; // 已被预测覆盖
    pub const UNF_ORDER: &str = "UNF_ORDER"; // 未预测

    // 预测
    pub const COM_FCST: &str = "COM_FCST";
    pub const NEW_FCST: &str = "NEW_FCST";

    // 默认预测需求号
    pub const FORECAST_DEMAND_ID: &str = "NetBaseForecast";

    // 跳过冲减时的标签
    pub const SKIPPED_ORDERS: &str = "Orders";
    pub const SKIPPED_FORECAST: &str = "Forecast";
}
