// ==========================================
// 需求冲减引擎 - 画像重分配 (Profiling Redistributor)
// ==========================================
// 职责: 把冲减粒度的结果展开到更细的输出时间粒度,总量守恒
// 步骤 (预测):
// 1) 冲减时间桶 → Partial Week,按天数比例分摊
// 2) Partial Week → 伸缩输出属性,同键求和
// 3) 最终属性与伸缩属性不同时:
//    - By Basis: 按基准表比例 + 取整策略
//    - 否则: 按伸缩表映射 (Equal Spread / Last Bucket / First Bucket)
// 订单: 取不晚于交期的最后一个最终属性桶
// 红线: 缺少列时告警并跳过,不报错
// ==========================================

use crate::config::NettingConfig;
use crate::domain::output::{DemandTypeKey, DemandTypeRow};
use crate::domain::table::Table;
use crate::domain::types::{BasisRoundingPolicy, ProfileSpreadMethod};
use crate::engine::bucket_resolver::parse_date;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// 取整前的浮点误差保护
const ROUNDING_GUARD: f64 = 1e-9;

// ==========================================
// 精确守恒整数分配
// ==========================================

/// 按比例把 total 分成整数份，总和严格等于 total
///
/// 按比例升序依次处理：每行分得 floor(剩余总量 × 比例 / 剩余比例)，
/// 最后一行取全部余量（total 非整数时小数部分也落在这一行）
///
/// # 返回
/// 与 ratios 顺序一致的分配结果
pub fn distribute_exact(total: f64, ratios: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..ratios.len()).collect();
    order.sort_by(|&a, &b| ratios[a].total_cmp(&ratios[b]));

    let mut result = vec![0.0; ratios.len()];
    let mut allocated = 0.0;
    let mut ratio_left: f64 = ratios.iter().sum();
    for (n, &i) in order.iter().enumerate() {
        if n + 1 == order.len() {
            result[i] = total - allocated;
            break;
        }
        let share = if ratio_left > ROUNDING_GUARD {
            ((total - allocated) * ratios[i] / ratio_left + ROUNDING_GUARD).floor()
        } else {
            0.0
        };
        result[i] = share;
        allocated += share;
        ratio_left -= ratios[i];
    }
    result
}

/// 按取整策略把 total 分到各比例
pub fn apply_rounding(total: f64, ratios: &[f64], policy: BasisRoundingPolicy) -> Vec<f64> {
    match policy {
        BasisRoundingPolicy::Distribute => distribute_exact(total, ratios),
        BasisRoundingPolicy::RoundUp => ratios.iter().map(|r| (total * r - ROUNDING_GUARD).ceil()).collect(),
        BasisRoundingPolicy::RoundDown => ratios.iter().map(|r| (total * r + ROUNDING_GUARD).floor()).collect(),
        BasisRoundingPolicy::Proportional => ratios.iter().map(|r| total * r).collect(),
    }
}

// ==========================================
// ProfilingRedistributor
// ==========================================
pub struct ProfilingRedistributor<'a> {
    config: &'a NettingConfig,
    telescopic: &'a Table,
    basis: &'a Table,
}

impl<'a> ProfilingRedistributor<'a> {
    pub fn new(config: &'a NettingConfig, telescopic: &'a Table, basis: &'a Table) -> Self {
        Self {
            config,
            telescopic,
            basis,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.profiling_enabled()
    }

    // ==========================================
    // 订单
    // ==========================================

    /// 订单行换到最终输出时间桶
    ///
    /// # 参数
    /// - rows: (需求类型行, 订单交期)
    pub fn profile_orders(&self, rows: Vec<(DemandTypeRow, Option<NaiveDate>)>) -> Vec<DemandTypeRow> {
        let final_attr = &self.config.profiling.final_attribute;
        if !self.telescopic.has_column(final_attr) {
            warn!(column = %final_attr, "伸缩时间表缺少最终输出时间属性，订单不做画像");
            return rows.into_iter().map(|(row, _)| row).collect();
        }

        let mut buckets: Vec<(NaiveDate, String)> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for value in self.telescopic.column_values(final_attr) {
            if !seen.insert(value) {
                continue;
            }
            if let Some(date) = parse_date(value) {
                buckets.push((date, value.to_string()));
            }
        }
        buckets.sort();

        rows.into_iter()
            .map(|(mut row, due)| {
                if let Some(due) = due {
                    let idx = buckets.partition_point(|(d, _)| *d <= due);
                    if idx > 0 {
                        row.time = buckets[idx - 1].1.clone();
                    }
                }
                row
            })
            .collect()
    }

    // ==========================================
    // 预测
    // ==========================================

    /// 预测行展开到最终输出时间粒度
    pub fn profile_forecasts(&self, rows: Vec<DemandTypeRow>) -> Vec<DemandTypeRow> {
        let cols = &self.config.columns;
        let profiling = &self.config.profiling;
        let required = [
            cols.time.as_str(),
            cols.partial_week.as_str(),
            cols.day.as_str(),
            profiling.telescopic_attribute.as_str(),
        ];
        if let Some(missing) = required.iter().find(|c| !self.telescopic.has_column(c)) {
            warn!(column = %missing, "伸缩时间表不完整，预测不做画像");
            return rows;
        }

        let telescopic_rows = self.spread_to_telescopic(rows);
        if profiling.final_attribute == profiling.telescopic_attribute {
            return telescopic_rows;
        }

        match profiling.spread_method {
            ProfileSpreadMethod::ByBasis => self.spread_by_basis(telescopic_rows),
            method => self.spread_by_mapping(telescopic_rows, method),
        }
    }

    /// 步骤 1 + 2：按天数分摊到 Partial Week，再换到伸缩输出属性
    fn spread_to_telescopic(&self, rows: Vec<DemandTypeRow>) -> Vec<DemandTypeRow> {
        let cols = &self.config.columns;
        let t = self.telescopic;
        let time_col = t.column_index(&cols.time);
        let pw_col = t.column_index(&cols.partial_week);
        let day_col = t.column_index(&cols.day);
        let tel_col = t.column_index(&self.config.profiling.telescopic_attribute);
        let (Some(time_col), Some(pw_col), Some(day_col), Some(tel_col)) = (time_col, pw_col, day_col, tel_col) else {
            return rows;
        };

        // Partial Week 天数
        let mut days: HashMap<&str, HashSet<&str>> = HashMap::new();
        // 冲减时间桶 → Partial Week（按出现顺序去重）
        let mut partial_weeks: HashMap<&str, Vec<&str>> = HashMap::new();
        // Partial Week → 伸缩属性
        let mut telescopic_of: HashMap<&str, &str> = HashMap::new();
        for r in 0..t.len() {
            let time = t.cell(r, time_col);
            let pw = t.cell(r, pw_col);
            if time.is_empty() || pw.is_empty() {
                continue;
            }
            days.entry(pw).or_default().insert(t.cell(r, day_col));
            let list = partial_weeks.entry(time).or_default();
            if !list.contains(&pw) {
                list.push(pw);
            }
            telescopic_of.entry(pw).or_insert_with(|| t.cell(r, tel_col));
        }

        let mut grouped: BTreeMap<DemandTypeKey, f64> = BTreeMap::new();
        let mut unmatched = 0usize;
        for row in rows {
            let Some(pws) = partial_weeks.get(row.time.as_str()) else {
                unmatched += 1;
                continue;
            };
            let basis: Vec<f64> = pws.iter().map(|pw| days.get(pw).map_or(0, HashSet::len) as f64).collect();
            let total: f64 = basis.iter().sum();
            if total <= 0.0 {
                unmatched += 1;
                continue;
            }
            for (pw, b) in pws.iter().zip(basis) {
                let tel = telescopic_of.get(pw).copied().unwrap_or(*pw);
                let mut key = row.key();
                key.4 = tel.to_string();
                *grouped.entry(key).or_insert(0.0) += row.quantity * b / total;
            }
        }
        if unmatched > 0 {
            warn!(rows = unmatched, "预测时间桶在伸缩时间表中不存在，已丢弃");
        }
        debug!(rows = grouped.len(), "预测已换到伸缩输出粒度");
        grouped.into_iter().map(|(key, quantity)| row_from_key(key, quantity)).collect()
    }

    /// 步骤 3a：按基准表比例分摊
    fn spread_by_basis(&self, rows: Vec<DemandTypeRow>) -> Vec<DemandTypeRow> {
        let cols = &self.config.columns;
        let profiling = &self.config.profiling;
        let b = self.basis;

        let (Some(measure_col), Some(final_col)) = (
            b.column_index(&profiling.basis_measure),
            b.column_index(&profiling.final_attribute),
        ) else {
            warn!(
                basis_measure = %profiling.basis_measure,
                final_attribute = %profiling.final_attribute,
                "基准表缺少基准度量或最终时间属性，预测不做画像"
            );
            return rows;
        };
        let assortment_col = b.column_index(&profiling.assortment_measure);

        // 需求类型行中可与基准表关联的列（下标对应 DemandTypeKey 的位置）
        let key_columns = [
            cols.version.as_str(),
            cols.item.as_str(),
            cols.location.as_str(),
            cols.customer.as_str(),
            profiling.telescopic_attribute.as_str(),
            cols.demand_id.as_str(),
            cols.demand_type.as_str(),
        ];
        let common: Vec<(usize, usize)> = key_columns
            .iter()
            .enumerate()
            .filter_map(|(k, name)| b.column_index(name).map(|c| (k, c)))
            .collect();
        if common.is_empty() {
            warn!("预测与基准表没有公共列，预测不做画像");
            return rows;
        }

        // 公共列取值 → [(最终时间桶, 基准值)]
        let mut basis_index: HashMap<Vec<&str>, Vec<(&str, f64)>> = HashMap::new();
        for r in 0..b.len() {
            if let Some(col) = assortment_col {
                if b.cell(r, col).parse::<f64>().map_or(true, |v| v <= 0.0) {
                    continue;
                }
            }
            let final_bucket = b.cell(r, final_col);
            if final_bucket.is_empty() {
                continue;
            }
            let value = b.cell(r, measure_col).parse::<f64>().unwrap_or(0.0).max(0.0);
            let key: Vec<&str> = common.iter().map(|&(_, c)| b.cell(r, c)).collect();
            basis_index.entry(key).or_default().push((final_bucket, value));
        }

        let policy = profiling.rounding_policy;
        let mut out = Vec::with_capacity(rows.len());
        let mut unmatched = 0usize;
        for row in rows {
            let row_key = row.key();
            let fields = key_fields(&row_key);
            let lookup: Vec<&str> = common.iter().map(|&(k, _)| fields[k]).collect();
            let Some(targets) = basis_index.get(&lookup) else {
                unmatched += 1;
                continue;
            };

            let total: f64 = targets.iter().map(|(_, v)| v).sum();
            let ratios: Vec<f64> = if total > 0.0 {
                targets.iter().map(|(_, v)| v / total).collect()
            } else {
                vec![1.0 / targets.len() as f64; targets.len()]
            };
            let shares = apply_rounding(row.quantity, &ratios, policy);
            for ((bucket, _), quantity) in targets.iter().zip(shares) {
                out.push(DemandTypeRow {
                    time: bucket.to_string(),
                    quantity,
                    ..row.clone()
                });
            }
        }
        if unmatched > 0 {
            warn!(rows = unmatched, "预测行在基准表中没有匹配，已丢弃");
        }
        out
    }

    /// 步骤 3b：按伸缩表映射到最终时间属性
    fn spread_by_mapping(&self, rows: Vec<DemandTypeRow>, method: ProfileSpreadMethod) -> Vec<DemandTypeRow> {
        let profiling = &self.config.profiling;
        let t = self.telescopic;
        let (Some(tel_col), Some(final_col)) = (
            t.column_index(&profiling.telescopic_attribute),
            t.column_index(&profiling.final_attribute),
        ) else {
            warn!(column = %profiling.final_attribute, "伸缩时间表缺少最终时间属性，预测不做分摊");
            return rows;
        };

        let mut targets: HashMap<&str, Vec<&str>> = HashMap::new();
        for r in 0..t.len() {
            let tel = t.cell(r, tel_col);
            let fin = t.cell(r, final_col);
            if tel.is_empty() || fin.is_empty() {
                continue;
            }
            let list = targets.entry(tel).or_default();
            if !list.contains(&fin) {
                list.push(fin);
            }
        }
        for list in targets.values_mut() {
            // 可解析为日期的按日期排序，否则保持出现顺序
            list.sort_by_key(|v| parse_date(v));
        }

        let mut out = Vec::with_capacity(rows.len());
        let mut unmatched = 0usize;
        for row in rows {
            let Some(list) = targets.get(row.time.as_str()).filter(|l| !l.is_empty()) else {
                unmatched += 1;
                continue;
            };
            let picks: Vec<(&str, f64)> = match method {
                ProfileSpreadMethod::EqualSpread => {
                    let share = row.quantity / list.len() as f64;
                    list.iter().map(|f| (*f, share)).collect()
                }
                ProfileSpreadMethod::LastBucket => list.last().map(|f| vec![(*f, row.quantity)]).unwrap_or_default(),
                _ => list.first().map(|f| vec![(*f, row.quantity)]).unwrap_or_default(),
            };
            for (bucket, quantity) in picks {
                out.push(DemandTypeRow {
                    time: bucket.to_string(),
                    quantity,
                    ..row.clone()
                });
            }
        }
        if unmatched > 0 {
            warn!(rows = unmatched, "伸缩时间桶没有对应的最终时间桶，已丢弃");
        }
        out
    }
}

fn key_fields(key: &DemandTypeKey) -> [&str; 7] {
    [
        key.0.as_str(),
        key.1.as_str(),
        key.2.as_str(),
        key.3.as_str(),
        key.4.as_str(),
        key.5.as_str(),
        key.6.as_str(),
    ]
}

fn row_from_key(key: DemandTypeKey, quantity: f64) -> DemandTypeRow {
    let (version, item, location, customer, time, demand_id, demand_type) = key;
    DemandTypeRow {
        version,
        item,
        location,
        customer,
        time,
        demand_id,
        demand_type,
        quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribute_exact_sorted_by_ratio() {
        let shares = distribute_exact(100.0, &[0.5, 0.3, 0.2]);
        assert_eq!(shares, vec![50.0, 30.0, 20.0]);
        assert_eq!(shares.iter().sum::<f64>(), 100.0);
    }

    #[test]
    fn test_distribute_exact_keeps_total_with_uneven_ratios() {
        let ratios = [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];
        let shares = distribute_exact(10.0, &ratios);
        assert_eq!(shares.iter().sum::<f64>(), 10.0);
        assert!(shares.iter().all(|s| s.fract() == 0.0));
    }

    #[test]
    fn test_distribute_exact_fractional_total_lands_on_largest_ratio() {
        // 非整数总量时小数部分全部落在最后一个（比例最大的）桶上
        let shares = distribute_exact(14.5, &[0.75, 0.25]);
        assert_eq!(shares, vec![11.5, 3.0]);
        assert_eq!(shares.iter().sum::<f64>(), 14.5);
    }

    #[test]
    fn test_rounding_policies() {
        assert_eq!(apply_rounding(10.0, &[0.25, 0.75], BasisRoundingPolicy::RoundUp), vec![3.0, 8.0]);
        assert_eq!(apply_rounding(10.0, &[0.25, 0.75], BasisRoundingPolicy::RoundDown), vec![2.0, 7.0]);
        assert_eq!(apply_rounding(10.0, &[0.25, 0.75], BasisRoundingPolicy::Proportional), vec![2.5, 7.5]);
    }
}
