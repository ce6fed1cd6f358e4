// ==========================================
// 需求冲减引擎 - 参数来源 Trait
// ==========================================
// 职责: 定义配置解析所需的扁平参数读取接口（选项名 → 字符串值）
// 红线: 不包含配置写入、不包含冲减逻辑
// ==========================================

use std::collections::{BTreeMap, HashMap};

// ==========================================
// ParameterSource Trait
// ==========================================
// 实现者: HashMap / BTreeMap（CLI 从 parameters.json 读取）
pub trait ParameterSource {
    /// 读取原始参数值
    fn get_param(&self, key: &str) -> Option<&str>;

    /// 读取参数值，去掉首尾空白；空字符串视为缺失
    fn get_trimmed(&self, key: &str) -> Option<&str> {
        self.get_param(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

impl ParameterSource for HashMap<String, String> {
    fn get_param(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl ParameterSource for BTreeMap<String, String> {
    fn get_param(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

// ==========================================
// 解析辅助函数
// ==========================================

/// 布尔解析："1" / "true"（不区分大小写）为真
pub fn string_to_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true")
}

/// 整数解析，失败回退为 -1
pub fn string_to_int(value: &str) -> i64 {
    let trimmed = value.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
        .unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_bool() {
        assert!(string_to_bool("1"));
        assert!(string_to_bool(" TRUE "));
        assert!(!string_to_bool("0"));
        assert!(!string_to_bool("yes"));
    }

    #[test]
    fn test_string_to_int_fallback() {
        assert_eq!(string_to_int("4"), 4);
        assert_eq!(string_to_int("4.0"), 4);
        assert_eq!(string_to_int("abc"), -1);
        assert_eq!(string_to_int(""), -1);
    }

    #[test]
    fn test_get_trimmed_treats_blank_as_missing() {
        let mut params = HashMap::new();
        params.insert("a".to_string(), "  ".to_string());
        params.insert("b".to_string(), " x ".to_string());
        assert_eq!(params.get_trimmed("a"), None);
        assert_eq!(params.get_trimmed("b"), Some("x"));
    }
}
