// ==========================================
// 需求冲减引擎 - 流管理器 (Stream Manager)
// ==========================================
// 职责: 解析订单流/预测流描述 (多流参数表 或 单一默认流)
// 输出: 每个 (订单流, 预测流) 组合的标签、RTF 资格与派生度量名
// ==========================================

use crate::config::NettingConfig;
use crate::domain::stream::{ForecastStreamParam, OrderStreamParam};
use crate::domain::types::demand_types;
use std::collections::HashSet;
use tracing::{debug, warn};

// ==========================================
// 需求类型标签
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDemandLabels {
    pub committed: String,
    pub new: String,
    pub unforecasted: String,
    pub past: String,
}

impl Default for OrderDemandLabels {
    fn default() -> Self {
        Self {
            committed: demand_types::COM_ORDER.to_string(),
            new: demand_types::NEW_ORDER.to_string(),
            unforecasted: demand_types::UNF_ORDER.to_string(),
            past: demand_types::UNF_ORDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastDemandLabels {
    pub committed: String,
    pub new: String,
}

impl Default for ForecastDemandLabels {
    fn default() -> Self {
        Self {
            committed: demand_types::COM_FCST.to_string(),
            new: demand_types::NEW_FCST.to_string(),
        }
    }
}

// ==========================================
// 流描述
// ==========================================

/// 订单流对某个预测流的链接
#[derive(Debug, Clone, PartialEq)]
pub struct StreamLink {
    pub forecast_stream: usize, // 预测流下标
    pub rtf_eligible: bool,
    pub labels: OrderDemandLabels,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderStreamDescriptor {
    pub name: String,
    pub links: Vec<StreamLink>, // 按消耗序号排列
    pub consumed_measure: String,
    pub remaining_measure: String,
}

impl OrderStreamDescriptor {
    /// 订单流是否参与 RTF 冲减
    pub fn rtf_eligible(&self) -> bool {
        self.links.iter().any(|l| l.rtf_eligible)
    }

    /// 过去订单标签（取第一个链接）
    pub fn past_label(&self) -> &str {
        self.links
            .first()
            .map(|l| l.labels.past.as_str())
            .unwrap_or(demand_types::UNF_ORDER)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastStreamDescriptor {
    pub measure: String, // 预测度量列名 = 流名
    pub demand_id: String,
    pub rtf_eligible: bool,
    pub is_base: bool,
    pub labels: ForecastDemandLabels,
    pub consumed_measure: String,
    pub remaining_measure: String,
}

fn derived_measures(name: &str) -> (String, String) {
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    (format!("consumed_{}", compact), format!("remaining_{}", compact))
}

fn label_or(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.trim().to_string()
    }
}

// ==========================================
// 流管理器
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct StreamManager {
    order_streams: Vec<OrderStreamDescriptor>,
    forecast_streams: Vec<ForecastStreamDescriptor>,
    multi_stream: bool,
}

impl StreamManager {
    /// 单一默认流：订单数量 ↔ 基础预测
    pub fn single_stream(config: &NettingConfig) -> Self {
        let cols = &config.columns;
        let (fc_consumed, fc_remaining) = derived_measures(&cols.forecast_quantity);
        let (or_consumed, or_remaining) = derived_measures(&cols.order_quantity);
        Self {
            order_streams: vec![OrderStreamDescriptor {
                name: cols.order_quantity.clone(),
                links: vec![StreamLink {
                    forecast_stream: 0,
                    rtf_eligible: true,
                    labels: OrderDemandLabels::default(),
                }],
                consumed_measure: or_consumed,
                remaining_measure: or_remaining,
            }],
            forecast_streams: vec![ForecastStreamDescriptor {
                measure: cols.forecast_quantity.clone(),
                demand_id: demand_types::FORECAST_DEMAND_ID.to_string(),
                rtf_eligible: true,
                is_base: true,
                labels: ForecastDemandLabels::default(),
                consumed_measure: fc_consumed,
                remaining_measure: fc_remaining,
            }],
            multi_stream: false,
        }
    }

    /// 解析流描述
    ///
    /// # 参数
    /// - order_params / forecast_params: 多流参数行
    /// - available_measures: 预测表中实际存在的度量列
    ///
    /// # 说明
    /// - 非多流模式或参数表为空时退化为单一默认流
    /// - 度量列缺失的预测流被跳过并告警
    pub fn resolve(
        config: &NettingConfig,
        order_params: &[OrderStreamParam],
        forecast_params: &[ForecastStreamParam],
        available_measures: &HashSet<String>,
    ) -> Self {
        if !config.use_multi_stream || order_params.is_empty() || forecast_params.is_empty() {
            if config.use_multi_stream {
                warn!("多流参数表为空，退化为单一默认流");
            }
            return Self::single_stream(config);
        }

        // ===== 预测流：按冲减序号排序 =====
        let mut fs_sorted: Vec<&ForecastStreamParam> = forecast_params.iter().collect();
        fs_sorted.sort_by(|a, b| a.sequence.total_cmp(&b.sequence));

        let mut forecast_streams: Vec<ForecastStreamDescriptor> = Vec::new();
        for param in fs_sorted {
            let name = param.forecast_stream.trim();
            if name.is_empty() || forecast_streams.iter().any(|f| f.measure == name) {
                continue;
            }
            if !available_measures.contains(name) {
                warn!(forecast_stream = name, "预测流对应的度量列不存在，跳过该预测流");
                continue;
            }
            let (consumed, remaining) = derived_measures(name);
            forecast_streams.push(ForecastStreamDescriptor {
                measure: name.to_string(),
                demand_id: label_or(&param.demand_id, demand_types::FORECAST_DEMAND_ID),
                rtf_eligible: param.rtf_eligible,
                is_base: name.to_lowercase().contains("base"),
                labels: ForecastDemandLabels {
                    committed: label_or(&param.committed_label, demand_types::COM_FCST),
                    new: label_or(&param.new_label, demand_types::NEW_FCST),
                },
                consumed_measure: consumed,
                remaining_measure: remaining,
            });
        }

        // ===== 订单流：按消耗序号排序，按首次出现分组 =====
        let mut os_sorted: Vec<&OrderStreamParam> = order_params.iter().collect();
        os_sorted.sort_by(|a, b| a.sequence.total_cmp(&b.sequence));

        let mut order_streams: Vec<OrderStreamDescriptor> = Vec::new();
        let mut unlinked = 0usize;
        for param in os_sorted {
            let name = param.order_stream.trim();
            let fs_name = param.forecast_stream.trim();
            if name.is_empty() || fs_name.is_empty() {
                continue;
            }
            let forecast_stream = match forecast_streams.iter().position(|f| f.measure == fs_name) {
                Some(idx) => idx,
                None => {
                    unlinked += 1;
                    continue;
                }
            };
            let link = StreamLink {
                forecast_stream,
                rtf_eligible: param.rtf_eligible,
                labels: OrderDemandLabels {
                    committed: label_or(&param.committed_label, demand_types::COM_ORDER),
                    new: label_or(&param.new_label, demand_types::NEW_ORDER),
                    unforecasted: label_or(&param.unforecasted_label, demand_types::UNF_ORDER),
                    past: label_or(&param.past_label, demand_types::UNF_ORDER),
                },
            };
            match order_streams.iter_mut().find(|o| o.name == name) {
                Some(existing) => existing.links.push(link),
                None => {
                    let (consumed, remaining) = derived_measures(name);
                    order_streams.push(OrderStreamDescriptor {
                        name: name.to_string(),
                        links: vec![link],
                        consumed_measure: consumed,
                        remaining_measure: remaining,
                    });
                }
            }
        }
        if unlinked > 0 {
            warn!(count = unlinked, "订单流参数引用了不存在的预测流，已忽略");
        }

        debug!(
            order_streams = order_streams.len(),
            forecast_streams = forecast_streams.len(),
            "多流描述解析完成"
        );

        Self {
            order_streams,
            forecast_streams,
            multi_stream: true,
        }
    }

    pub fn is_multi_stream(&self) -> bool {
        self.multi_stream
    }

    pub fn order_streams(&self) -> &[OrderStreamDescriptor] {
        &self.order_streams
    }

    pub fn forecast_streams(&self) -> &[ForecastStreamDescriptor] {
        &self.forecast_streams
    }

    pub fn order_stream(&self, index: usize) -> Option<&OrderStreamDescriptor> {
        self.order_streams.get(index)
    }

    pub fn forecast_stream(&self, index: usize) -> Option<&ForecastStreamDescriptor> {
        self.forecast_streams.get(index)
    }

    /// 订单所属订单流下标（单流模式下所有订单属于第 0 个流）
    pub fn stream_of(&self, order_type: &str) -> Option<usize> {
        if !self.multi_stream {
            return Some(0);
        }
        self.order_streams.iter().position(|o| o.name == order_type.trim())
    }

    /// 所有预测流的需求号（RTF 阶段用于识别伪订单）
    pub fn default_demand_ids(&self) -> HashSet<&str> {
        self.forecast_streams
            .iter()
            .map(|f| f.demand_id.as_str())
            .collect()
    }

    /// 伪订单的时间优先级偏移
    ///
    /// # 参数
    /// - max_time_priority: 全部行的最大时间优先级
    /// - prioritize_by_time: 按时间优先时伪订单只排在同一时间桶订单之后
    pub fn pseudo_order_offset(&self, max_time_priority: f64, prioritize_by_time: bool) -> f64 {
        if prioritize_by_time {
            0.1
        } else {
            max_time_priority + 1.0
        }
    }
}
