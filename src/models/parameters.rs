//! # 计算参数数据模型
//!
//! `ParameterSet` 是 INPUT 文件中 key/value 控制参数的类型化容器，
//! 以 `BTreeMap` 存储，迭代顺序即写出顺序（按 key 排序）。
//!
//! ## 依赖关系
//! - 被 `deck/input.rs`, `resolve/parameters.rs`, `store/`, `workflow/` 使用

use crate::error::{RelaxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 单个参数值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// 从命令行字符串推断类型：整数 > 浮点 > 布尔 > 字符串
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(v) = raw.parse::<i64>() {
            return ParamValue::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return ParamValue::Float(v);
        }
        match raw.to_ascii_lowercase().as_str() {
            "true" | ".true." => ParamValue::Bool(true),
            "false" | ".false." => ParamValue::Bool(false),
            _ => ParamValue::Str(raw.to_string()),
        }
    }

    /// 数值视图；字符串形式的数字同样接受
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Str(s) => s.trim().parse().ok(),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", u8::from(*v)),
            ParamValue::Int(v) => write!(f, "{}", v),
            // Debug 输出最短可回读形式，整数值保留 ".0"
            ParamValue::Float(v) => write!(f, "{:?}", v),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// 有序参数集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    entries: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// 取必需参数，缺失时返回 ValidationError
    pub fn require(&self, key: &str) -> Result<&ParamValue> {
        self.entries.get(key).ok_or_else(|| {
            RelaxError::ValidationError(format!("You need to specify `{}`", key))
        })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// 仅在 key 不存在时写入
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn pop(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.remove(key)
    }

    pub fn pop_or(&mut self, key: &str, default: impl Into<ParamValue>) -> ParamValue {
        self.entries.remove(key).unwrap_or_else(|| default.into())
    }

    /// 逐 key 覆盖：`overrides` 中的值优先
    pub fn merge(&mut self, overrides: &ParameterSet) {
        for (key, value) in &overrides.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// 按 key 排序迭代
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// 命名参数预设（持久化、按名称唯一）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPreset {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub parameters: ParameterSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_infers_types() {
        assert_eq!(ParamValue::parse("80"), ParamValue::Int(80));
        assert_eq!(ParamValue::parse("1e-7"), ParamValue::Float(1e-7));
        assert_eq!(ParamValue::parse("true"), ParamValue::Bool(true));
        assert_eq!(ParamValue::parse("pw"), ParamValue::Str("pw".to_string()));
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(ParamValue::Float(80.0).to_string(), "80.0");
        assert_eq!(ParamValue::Float(0.2).to_string(), "0.2");
        assert_eq!(ParamValue::Int(4).to_string(), "4");
        assert_eq!(ParamValue::Bool(false).to_string(), "0");
    }

    #[test]
    fn test_as_f64_accepts_numeric_strings() {
        assert_eq!(ParamValue::from("0.2").as_f64(), Some(0.2));
        assert_eq!(ParamValue::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_merge_overrides_key_by_key() {
        let mut base: ParameterSet = [("ecutwfc", 50.0), ("scf_thr", 1e-6)].into_iter().collect();
        let overrides: ParameterSet = [("ecutwfc", 80.0)].into_iter().collect();
        base.merge(&overrides);
        assert_eq!(base.get("ecutwfc"), Some(&ParamValue::Float(80.0)));
        assert_eq!(base.get("scf_thr"), Some(&ParamValue::Float(1e-6)));
    }

    #[test]
    fn test_iteration_is_sorted_regardless_of_insertion() {
        let mut set = ParameterSet::new();
        set.insert("zeta", 1);
        set.insert("alpha", 2);
        set.insert("mid", 3);
        let keys: Vec<&str> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_require_and_pop_or() {
        let mut set: ParameterSet = [("a", 1)].into_iter().collect();
        assert!(set.require("a").is_ok());
        assert!(matches!(set.require("b"), Err(RelaxError::ValidationError(_))));
        assert_eq!(set.pop_or("density", "0.2"), ParamValue::from("0.2"));
        assert_eq!(set.pop_or("a", 0), ParamValue::Int(1));
        assert!(set.is_empty());
    }

    #[test]
    fn test_json_round_trip_keeps_types() {
        let json = r#"{"ecutwfc": 80, "scf_thr": 1e-7, "basis_type": "pw", "gamma_only": false}"#;
        let set: ParameterSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.get("ecutwfc"), Some(&ParamValue::Int(80)));
        assert_eq!(set.get("scf_thr"), Some(&ParamValue::Float(1e-7)));
        assert_eq!(set.get("gamma_only"), Some(&ParamValue::Bool(false)));
    }
}
