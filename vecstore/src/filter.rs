use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vecstore::Metadata;

/// Metadata predicate applied during a query.
///
/// A record whose metadata lacks the field never matches. Numeric bounds
/// only match numeric values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    Gte(String, f64),
    Lte(String, f64),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, bound: f64) -> Self {
        Filter::Gte(field.into(), bound)
    }

    pub fn lte(field: impl Into<String>, bound: f64) -> Self {
        Filter::Lte(field.into(), bound)
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Filter::Eq(field, want) => metadata.get(field) == Some(want),
            Filter::In(field, set) => metadata.get(field).is_some_and(|v| set.contains(v)),
            Filter::Gte(field, bound) => number(metadata, field).is_some_and(|n| n >= *bound),
            Filter::Lte(field, bound) => number(metadata, field).is_some_and(|n| n <= *bound),
            Filter::And(all) => all.iter().all(|f| f.matches(metadata)),
        }
    }
}

fn number(metadata: &Metadata, field: &str) -> Option<f64> {
    metadata.get(field).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(v: Value) -> Metadata {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_eq_and_in() {
        let m = meta(json!({"platform": "youtube", "followers": 1200}));
        assert!(Filter::eq("platform", "youtube").matches(&m));
        assert!(!Filter::eq("platform", "tiktok").matches(&m));
        assert!(Filter::In("platform".into(), vec![json!("tiktok"), json!("youtube")]).matches(&m));
        assert!(!Filter::eq("missing", "x").matches(&m));
    }

    #[test]
    fn test_numeric_bounds() {
        let m = meta(json!({"followers": 1200, "platform": "youtube"}));
        assert!(Filter::gte("followers", 1000.0).matches(&m));
        assert!(!Filter::lte("followers", 1000.0).matches(&m));
        assert!(!Filter::gte("platform", 0.0).matches(&m));
        assert!(
            Filter::And(vec![Filter::gte("followers", 1000.0), Filter::lte("followers", 2000.0)])
                .matches(&m)
        );
    }

    #[test]
    fn test_deserialize() {
        let f: Filter = serde_json::from_value(json!({"gte": ["followers", 10.0]})).unwrap();
        assert_eq!(f, Filter::gte("followers", 10.0));
    }
}
