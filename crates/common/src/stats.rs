use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single statistic reported by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Statistics keyed by dotted name, in deterministic order.
pub type Stats = BTreeMap<String, StatValue>;

impl StatValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Combine two values reported under the same key: integers add,
    /// mixed numbers add as floats, anything else keeps the first value.
    pub fn merge(self, other: StatValue) -> StatValue {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a + b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Self::Float(x + y),
                _ => a,
            },
        }
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// Counts past `i64::MAX` saturate.
impl From<usize> for StatValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u64> for StatValue {
    fn from(v: u64) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl std::fmt::Display for StatValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.3}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_numbers() {
        assert_eq!(StatValue::Int(2).merge(StatValue::Int(3)), StatValue::Int(5));
        assert_eq!(
            StatValue::Int(2).merge(StatValue::Float(0.5)),
            StatValue::Float(2.5)
        );
    }

    #[test]
    fn merge_keeps_first_text() {
        let merged = StatValue::from("a").merge(StatValue::Int(1));
        assert_eq!(merged, StatValue::Text("a".into()));
    }

    #[test]
    fn large_counts_saturate() {
        assert_eq!(StatValue::from(u64::MAX), StatValue::Int(i64::MAX));
        assert_eq!(StatValue::from(usize::MAX), StatValue::Int(i64::MAX));
        assert_eq!(StatValue::from(7_u64), StatValue::Int(7));
    }
}
