// ==========================================
// 需求冲减引擎 - 订单/预测关联图
// ==========================================
// 职责: 按关联图为需求行生成候选坐标
// 顺序: 按关联优先级遍历目标 (item, location, customer),
//       每个目标依次取当前桶、向前桶、向后桶
// ==========================================

use crate::domain::records::{AssociationEdge, BucketParams, Coord};
use crate::engine::bucket_resolver::BucketResolver;
use std::collections::HashMap;

type Grain = (String, String, String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    Forecast, // 订单 ↔ 预测
    Rtf,      // 需求 ↔ RTF
}

#[derive(Debug, Clone, Default)]
pub struct AssociationGraph {
    forecast_targets: HashMap<Grain, Vec<Grain>>,
    rtf_targets: HashMap<Grain, Vec<Grain>>,
}

impl AssociationGraph {
    pub fn build(edges: &[AssociationEdge]) -> Self {
        let mut sorted: Vec<&AssociationEdge> = edges.iter().collect();
        sorted.sort_by(|a, b| {
            (&a.from_item, &a.from_location, &a.from_customer)
                .cmp(&(&b.from_item, &b.from_location, &b.from_customer))
                .then(a.priority.total_cmp(&b.priority))
        });

        let mut graph = AssociationGraph::default();
        for edge in sorted {
            let from = (
                edge.from_item.clone(),
                edge.from_location.clone(),
                edge.from_customer.clone(),
            );
            let to = (
                edge.to_item.clone(),
                edge.to_location.clone(),
                edge.to_customer.clone(),
            );
            if edge.forecast_association {
                graph.forecast_targets.entry(from.clone()).or_default().push(to.clone());
            }
            if edge.rtf_association {
                graph.rtf_targets.entry(from).or_default().push(to);
            }
        }
        graph
    }

    pub fn is_empty(&self) -> bool {
        self.forecast_targets.is_empty() && self.rtf_targets.is_empty()
    }

    /// 候选坐标；没有关联的行返回空列表
    pub fn candidates(
        &self,
        kind: AssociationKind,
        coord: &Coord,
        params: &BucketParams,
        buckets: &BucketResolver,
    ) -> Vec<Coord> {
        let targets = match kind {
            AssociationKind::Forecast => &self.forecast_targets,
            AssociationKind::Rtf => &self.rtf_targets,
        };
        let from = coord.grain();
        let Some(to_list) = targets.get(&from) else {
            return Vec::new();
        };

        let backward = buckets.backward(&coord.time, params.backward);
        let forward = buckets.forward(&coord.time, params.forward);

        let mut result = Vec::with_capacity(to_list.len() * (1 + backward.len() + forward.len()));
        for (item, location, customer) in to_list {
            let times = std::iter::once(coord.time.as_str())
                .chain(backward.iter().copied())
                .chain(forward.iter().copied());
            for time in times {
                result.push(Coord::new(item.as_str(), location.as_str(), customer.as_str(), time));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(to_item: &str, priority: f64, forecast: bool, rtf: bool) -> AssociationEdge {
        AssociationEdge {
            from_item: "A".into(),
            from_location: "L".into(),
            from_customer: "C".into(),
            to_item: to_item.into(),
            to_location: "L".into(),
            to_customer: "C".into(),
            priority,
            forecast_association: forecast,
            rtf_association: rtf,
        }
    }

    #[test]
    fn test_targets_in_priority_order_with_time_window() {
        let graph = AssociationGraph::build(&[edge("Y", 2.0, true, false), edge("X", 1.0, true, true)]);
        let buckets = BucketResolver::new(vec!["W1", "W2", "W3"]);
        let params = BucketParams {
            backward: 1,
            forward: 1,
            upward: Default::default(),
        };
        let got = graph.candidates(AssociationKind::Forecast, &Coord::new("A", "L", "C", "W2"), &params, &buckets);
        let keys: Vec<(&str, &str)> = got.iter().map(|c| (c.item.as_str(), c.time.as_str())).collect();
        assert_eq!(
            keys,
            vec![("X", "W2"), ("X", "W1"), ("X", "W3"), ("Y", "W2"), ("Y", "W1"), ("Y", "W3")]
        );

        let rtf = graph.candidates(AssociationKind::Rtf, &Coord::new("A", "L", "C", "W2"), &BucketParams::default(), &buckets);
        assert_eq!(rtf, vec![Coord::new("X", "L", "C", "W2")]);
    }

    #[test]
    fn test_unassociated_row_has_no_candidates() {
        let graph = AssociationGraph::build(&[edge("X", 1.0, true, true)]);
        let buckets = BucketResolver::new(vec!["W1"]);
        assert!(graph
            .candidates(AssociationKind::Forecast, &Coord::new("Z", "L", "C", "W1"), &BucketParams::default(), &buckets)
            .is_empty());
    }
}
