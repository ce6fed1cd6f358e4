// ==========================================
// 需求冲减引擎 - 需求类型划分 (Demand-Type Classifier)
// ==========================================
// 订单:
// - RTF 覆盖部分 → 已承诺 (COM)
// - 未被 RTF 覆盖、但被预测覆盖 → 新增 (NEW)
// - 两者都未覆盖 → 未预测 (UNF)
// 拆分模式下按预测流顺序分摊消耗量,最后一个流吸收余量
// 预测伪订单: RTF 覆盖 → COM_FCST, 其余 → NEW_FCST
// 数量为 0 的行丢弃
// ==========================================

use crate::domain::output::DemandTypeRow;
use crate::domain::records::Coord;
use crate::engine::stream::{ForecastDemandLabels, OrderDemandLabels, StreamManager};
use crate::engine::workspace::{DemandOrigin, DemandRow, QUANTITY_EPSILON};

// ==========================================
// DemandTypeClassifier - 需求类型划分引擎
// ==========================================
pub struct DemandTypeClassifier {
    split: bool, // 一行订单可拆成多个需求类型
}

impl DemandTypeClassifier {
    /// # 参数
    /// - split: 是否拆分需求类型 (Split Demand Types)
    pub fn new(split: bool) -> Self {
        Self { split }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 订单行 → 需求类型行
    ///
    /// # 参数
    /// - coord_of: 输出坐标（原始粒度或聚合粒度）
    pub fn classify_order<F>(&self, row: &DemandRow, streams: &StreamManager, coord_of: F) -> Vec<DemandTypeRow>
    where
        F: Fn(&DemandRow) -> Coord,
    {
        let DemandOrigin::Order { stream } = row.origin else {
            return Vec::new();
        };
        let Some(descriptor) = streams.order_stream(stream) else {
            return Vec::new();
        };
        let coord = coord_of(row);
        let default_labels = OrderDemandLabels::default();

        let mut out = Vec::new();
        if !self.split {
            // 不拆分时固定使用默认标签
            let label = if row.covered_by_rtf > QUANTITY_EPSILON {
                &default_labels.committed
            } else if row.consumed_by_all_forecast() > QUANTITY_EPSILON {
                &default_labels.new
            } else {
                &default_labels.unforecasted
            };
            push_row(&mut out, row, &coord, label, row.open_quantity);
            return out;
        }

        // ===== 拆分：COM / NEW / UNF =====
        let committed = row.covered_by_rtf.min(row.open_quantity).max(0.0);
        let unforecasted = row.not_covered_by_rtf().min(row.remaining_after_forecast());
        let new = (row.open_quantity - committed - unforecasted).max(0.0);
        let first_labels = descriptor.links.first().map(|l| &l.labels).unwrap_or(&default_labels);
        // 未预测部分取最后一个预测流的标签
        let unforecasted_label = descriptor
            .links
            .last()
            .map(|l| &l.labels.unforecasted)
            .unwrap_or(&default_labels.unforecasted);

        if descriptor.links.len() <= 1 {
            push_row(&mut out, row, &coord, &first_labels.committed, committed);
            push_row(&mut out, row, &coord, &first_labels.new, new);
            push_row(&mut out, row, &coord, unforecasted_label, unforecasted);
            return out;
        }

        // 多个预测流：按流顺序分摊 COM 与 NEW，最后一个流吸收余量
        let mut committed_left = committed;
        let mut new_left = new;
        let last = descriptor.links.len() - 1;
        for (i, link) in descriptor.links.iter().enumerate() {
            let (c, n) = if i == last {
                (committed_left, new_left)
            } else {
                let consumed = row.consumed_by_stream.get(link.forecast_stream).copied().unwrap_or(0.0);
                let c = consumed.min(committed_left);
                let n = (consumed - c).min(new_left).max(0.0);
                (c, n)
            };
            committed_left -= c;
            new_left -= n;
            push_row(&mut out, row, &coord, &link.labels.committed, c);
            push_row(&mut out, row, &coord, &link.labels.new, n);
        }
        push_row(&mut out, row, &coord, unforecasted_label, unforecasted);
        out
    }

    /// 预测伪订单 → 需求类型行
    pub fn classify_forecast<F>(&self, row: &DemandRow, streams: &StreamManager, coord_of: F) -> Vec<DemandTypeRow>
    where
        F: Fn(&DemandRow) -> Coord,
    {
        let DemandOrigin::Forecast { stream, .. } = row.origin else {
            return Vec::new();
        };
        let default_labels = ForecastDemandLabels::default();
        let labels = match streams.forecast_stream(stream) {
            Some(fs) if self.split => &fs.labels,
            _ => &default_labels,
        };

        let coord = coord_of(row);
        let committed = row.covered_by_rtf.min(row.open_quantity).max(0.0);
        let new = (row.open_quantity - committed).max(0.0);

        let mut out = Vec::new();
        push_row(&mut out, row, &coord, &labels.committed, committed);
        push_row(&mut out, row, &coord, &labels.new, new);
        out
    }

    /// 过去订单（多流模式）：整行使用订单流的过去订单标签
    pub fn classify_past_order(&self, row: &DemandRow, streams: &StreamManager) -> Vec<DemandTypeRow> {
        let DemandOrigin::Order { stream } = row.origin else {
            return Vec::new();
        };
        let Some(descriptor) = streams.order_stream(stream) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        push_row(&mut out, row, &row.native, descriptor.past_label(), row.open_quantity);
        out
    }
}

fn push_row(out: &mut Vec<DemandTypeRow>, row: &DemandRow, coord: &Coord, label: &str, quantity: f64) {
    if quantity <= QUANTITY_EPSILON {
        return;
    }
    out.push(DemandTypeRow {
        version: row.version.clone(),
        item: coord.item.clone(),
        location: coord.location.clone(),
        customer: coord.customer.clone(),
        time: coord.time.clone(),
        demand_id: row.demand_id.clone(),
        demand_type: label.to_string(),
        quantity,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NettingConfig;
    use crate::domain::records::BucketParams;
    use crate::domain::stream::{ForecastStreamParam, OrderStreamParam};
    use std::collections::HashSet;

    fn order_row(open: f64, consumed: Vec<f64>, covered: f64) -> DemandRow {
        let consumed_total: f64 = consumed.iter().sum();
        DemandRow {
            version: "CW".into(),
            demand_id: "O1".into(),
            native: Coord::new("A", "L", "C", "W1"),
            netting: Coord::new("A", "L", "C", "W1"),
            origin: DemandOrigin::Order { stream: 0 },
            open_quantity: open,
            priority: None,
            time_priority: 0.0,
            params: BucketParams::default(),
            exclude_netting: false,
            exclude_planning: false,
            rtf_eligible: true,
            due_date: None,
            remaining: (open - consumed_total).max(0.0),
            consumed_by_stream: consumed,
            covered_by_rtf: covered,
        }
    }

    fn native(row: &DemandRow) -> Coord {
        row.native.clone()
    }

    fn types(rows: &[DemandTypeRow]) -> Vec<(&str, f64)> {
        rows.iter().map(|r| (r.demand_type.as_str(), r.quantity)).collect()
    }

    #[test]
    fn test_split_single_stream() {
        let streams = StreamManager::single_stream(&NettingConfig::default());
        let classifier = DemandTypeClassifier::new(true);
        // 开放 15：预测消耗 10，RTF 覆盖 4
        let rows = classifier.classify_order(&order_row(15.0, vec![10.0], 4.0), &streams, native);
        assert_eq!(
            types(&rows),
            vec![("COM_ORDER", 4.0), ("NEW_ORDER", 6.0), ("UNF_ORDER", 5.0)]
        );
        let total: f64 = rows.iter().map(|r| r.quantity).sum();
        assert_eq!(total, 15.0);
    }

    #[test]
    fn test_no_split_picks_single_label() {
        let streams = StreamManager::single_stream(&NettingConfig::default());
        let classifier = DemandTypeClassifier::new(false);

        let rows = classifier.classify_order(&order_row(15.0, vec![10.0], 0.0), &streams, native);
        assert_eq!(types(&rows), vec![("NEW_ORDER", 15.0)]);

        let rows = classifier.classify_order(&order_row(15.0, vec![0.0], 0.0), &streams, native);
        assert_eq!(types(&rows), vec![("UNF_ORDER", 15.0)]);

        let rows = classifier.classify_order(&order_row(15.0, vec![0.0], 1.0), &streams, native);
        assert_eq!(types(&rows), vec![("COM_ORDER", 15.0)]);
    }

    #[test]
    fn test_split_across_streams_last_absorbs_residual() {
        let config = NettingConfig {
            use_multi_stream: true,
            ..Default::default()
        };
        let order_param = |seq: f64, fs: &str, label: &str| OrderStreamParam {
            sequence: seq,
            order_stream: "Retail".into(),
            forecast_stream: fs.into(),
            rtf_eligible: true,
            committed_label: format!("COM_{}", label),
            new_label: format!("NEW_{}", label),
            unforecasted_label: "UNF".into(),
            past_label: String::new(),
        };
        let forecast_param = |seq: f64, fs: &str| ForecastStreamParam {
            sequence: seq,
            forecast_stream: fs.into(),
            demand_id: format!("{}ID", fs),
            rtf_eligible: true,
            committed_label: String::new(),
            new_label: String::new(),
        };
        let available: HashSet<String> = ["Base", "Promo"].iter().map(|s| s.to_string()).collect();
        let streams = StreamManager::resolve(
            &config,
            &[order_param(1.0, "Base", "B"), order_param(2.0, "Promo", "P")],
            &[forecast_param(1.0, "Base"), forecast_param(2.0, "Promo")],
            &available,
        );

        // 开放 10：Base 消耗 3，Promo 消耗 5，RTF 覆盖 4
        let classifier = DemandTypeClassifier::new(true);
        let rows = classifier.classify_order(&order_row(10.0, vec![3.0, 5.0], 4.0), &streams, native);
        assert_eq!(
            types(&rows),
            vec![("COM_B", 3.0), ("COM_P", 1.0), ("NEW_P", 4.0), ("UNF", 2.0)]
        );
    }

    fn two_link_streams(unforecasted: [&str; 2]) -> StreamManager {
        let config = NettingConfig {
            use_multi_stream: true,
            ..Default::default()
        };
        let links = [("Base", unforecasted[0]), ("Promo", unforecasted[1])];
        let order_params: Vec<OrderStreamParam> = links
            .iter()
            .enumerate()
            .map(|(i, (fs, unf))| OrderStreamParam {
                sequence: (i + 1) as f64,
                order_stream: "Retail".into(),
                forecast_stream: fs.to_string(),
                rtf_eligible: true,
                committed_label: format!("COM_{}", fs),
                new_label: format!("NEW_{}", fs),
                unforecasted_label: unf.to_string(),
                past_label: String::new(),
            })
            .collect();
        let forecast_params: Vec<ForecastStreamParam> = links
            .iter()
            .enumerate()
            .map(|(i, (fs, _))| ForecastStreamParam {
                sequence: (i + 1) as f64,
                forecast_stream: fs.to_string(),
                demand_id: format!("{}ID", fs),
                rtf_eligible: true,
                committed_label: String::new(),
                new_label: String::new(),
            })
            .collect();
        let available: HashSet<String> = ["Base", "Promo"].iter().map(|s| s.to_string()).collect();
        StreamManager::resolve(&config, &order_params, &forecast_params, &available)
    }

    #[test]
    fn test_unforecasted_uses_last_link_label() {
        let streams = two_link_streams(["UNF_BASE", "UNF_PROMO"]);
        let classifier = DemandTypeClassifier::new(true);

        let rows = classifier.classify_order(&order_row(10.0, vec![0.0, 0.0], 0.0), &streams, native);
        assert_eq!(types(&rows), vec![("UNF_PROMO", 10.0)]);

        let rows = classifier.classify_order(&order_row(10.0, vec![4.0, 0.0], 0.0), &streams, native);
        assert_eq!(types(&rows), vec![("NEW_Base", 4.0), ("UNF_PROMO", 6.0)]);
    }

    #[test]
    fn test_unsplit_ignores_stream_labels() {
        let streams = two_link_streams(["UNF_BASE", "UNF_PROMO"]);
        let classifier = DemandTypeClassifier::new(false);

        let rows = classifier.classify_order(&order_row(10.0, vec![3.0, 0.0], 0.0), &streams, native);
        assert_eq!(types(&rows), vec![("NEW_ORDER", 10.0)]);

        let rows = classifier.classify_order(&order_row(10.0, vec![0.0, 0.0], 0.0), &streams, native);
        assert_eq!(types(&rows), vec![("UNF_ORDER", 10.0)]);

        let rows = classifier.classify_order(&order_row(10.0, vec![0.0, 0.0], 2.0), &streams, native);
        assert_eq!(types(&rows), vec![("COM_ORDER", 10.0)]);
    }

    #[test]
    fn test_forecast_committed_and_new() {
        let streams = StreamManager::single_stream(&NettingConfig::default());
        let mut row = order_row(8.0, vec![0.0], 3.0);
        row.origin = DemandOrigin::Forecast { stream: 0, pool_row: 0 };
        let rows = DemandTypeClassifier::new(true).classify_forecast(&row, &streams, native);
        assert_eq!(types(&rows), vec![("COM_FCST", 3.0), ("NEW_FCST", 5.0)]);
    }

    #[test]
    fn test_zero_quantity_rows_dropped() {
        let streams = StreamManager::single_stream(&NettingConfig::default());
        let rows = DemandTypeClassifier::new(true).classify_order(&order_row(5.0, vec![5.0], 5.0), &streams, native);
        assert_eq!(types(&rows), vec![("COM_ORDER", 5.0)]);
    }
}
