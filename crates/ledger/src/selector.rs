//! Document selectors
//!
//! A selector is a conjunction of equality tests on top-level fields of a
//! JSON record, the CouchDB `{"selector": {...}}` subset the chaincode
//! needs. Only scalar equality is understood.

use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector {
    fields: Map<String, Value>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field == value` to the conjunction.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, record: &Value) -> bool {
        let Some(obj) = record.as_object() else { return false };
        self.fields.iter().all(|(k, want)| obj.get(k) == Some(want))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_requires_every_field() {
        let s = Selector::new().eq("ObjectType", "results").eq("Owner", "bob");
        assert!(s.matches(&json!({"ObjectType": "results", "Owner": "bob", "x": 1})));
        assert!(!s.matches(&json!({"ObjectType": "results"})));
        assert!(!s.matches(&json!([1, 2])));
    }

    #[test]
    fn empty_selector_matches_any_object() {
        assert!(Selector::new().matches(&json!({})));
    }
}
