// ==========================================
// 需求冲减引擎 - 时间桶解析器 (Bucket Resolver)
// ==========================================
// 职责: 按日期升序排列所有时间桶,回答"T 之前/之后 N 个桶"
// 约定: 越界请求静默截断,不报错
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};

/// 解析时间桶/日期字符串
///
/// 支持: 2024-01-07 / 2024/01/07 / 20240107 / 07-Jan-24 / 01/07/2024 / 带时间部分
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    const DATE_FORMATS: [&str; 6] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%d-%b-%y", "%d-%b-%Y", "%m/%d/%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    None
}

#[derive(Debug, Clone, Default)]
pub struct BucketResolver {
    buckets: Vec<String>,
    dates: Vec<Option<NaiveDate>>,
    position: HashMap<String, usize>,
    backward_before_current: bool, // 为真时 backward 结果由远及近
}

impl BucketResolver {
    /// 构建解析器：去重后按日期升序，无法解析的桶按字典序排在最后
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_start_dates(keys, &HashMap::new())
    }

    /// 构建解析器：桶名本身不是日期时，从 start_dates 取桶的起始日期
    pub fn with_start_dates<I, S>(keys: I, start_dates: &HashMap<String, NaiveDate>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<(Option<NaiveDate>, String)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for key in keys {
            let key = key.as_ref().trim();
            if key.is_empty() || !seen.insert(key.to_string()) {
                continue;
            }
            let date = parse_date(key).or_else(|| start_dates.get(key).copied());
            unique.push((date, key.to_string()));
        }
        unique.sort_by(|a, b| {
            a.0.is_none()
                .cmp(&b.0.is_none())
                .then(a.0.cmp(&b.0))
                .then_with(|| a.1.cmp(&b.1))
        });

        let position = unique
            .iter()
            .enumerate()
            .map(|(i, (_, key))| (key.clone(), i))
            .collect();
        let (dates, buckets): (Vec<Option<NaiveDate>>, Vec<String>) = unique.into_iter().unzip();
        Self {
            buckets,
            dates,
            position,
            backward_before_current: false,
        }
    }

    pub fn with_backward_before_current(mut self, flag: bool) -> Self {
        self.backward_before_current = flag;
        self
    }

    pub fn backward_before_current(&self) -> bool {
        self.backward_before_current
    }

    /// T 之前的 n 个桶（默认由近及远）
    pub fn backward(&self, t: &str, n: usize) -> Vec<&str> {
        let pos = match self.position.get(t) {
            Some(&p) => p,
            None => return Vec::new(),
        };
        let start = pos.saturating_sub(n);
        let mut result: Vec<&str> = self.buckets[start..pos].iter().rev().map(String::as_str).collect();
        if self.backward_before_current {
            result.reverse();
        }
        result
    }

    /// T 之后的 n 个桶（由近及远）
    pub fn forward(&self, t: &str, n: usize) -> Vec<&str> {
        let pos = match self.position.get(t) {
            Some(&p) => p,
            None => return Vec::new(),
        };
        self.buckets
            .iter()
            .skip(pos + 1)
            .take(n)
            .map(String::as_str)
            .collect()
    }

    /// 时间优先级（桶序号）
    pub fn position(&self, t: &str) -> Option<usize> {
        self.position.get(t).copied()
    }

    pub fn date_of(&self, t: &str) -> Option<NaiveDate> {
        self.position(t).and_then(|p| self.dates[p])
    }

    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
