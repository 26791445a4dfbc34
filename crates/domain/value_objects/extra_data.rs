use serde_json::Value;

/// Ordered log of gateway response snapshots kept on a payment. The last entry is current.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraDataLog {
    entries: Vec<Value>,
}

impl ExtraDataLog {
    /// Accepts the stored JSON in any shape: an array is the log itself, `null`
    /// is empty, anything else is a single legacy snapshot.
    pub fn from_value(value: Value) -> Self {
        let entries = match value {
            Value::Array(entries) => entries,
            Value::Null => Vec::new(),
            single => vec![single],
        };
        Self { entries }
    }

    pub fn push(&mut self, snapshot: Value) {
        self.entries.push(snapshot);
    }

    pub fn latest(&self) -> Option<&Value> {
        self.entries.last()
    }

    /// String field of the latest snapshot, e.g. `orderId`.
    pub fn latest_field(&self, key: &str) -> Option<String> {
        self.latest()
            .and_then(|snapshot| snapshot.get(key))
            .and_then(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Array(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn appends_after_legacy_single_object() {
        let mut log = ExtraDataLog::from_value(json!({"orderId": "a"}));
        log.push(json!({"orderId": "b"}));

        assert_eq!(log.len(), 2);
        assert_eq!(log.latest_field("orderId").as_deref(), Some("b"));
        assert_eq!(
            log.into_value(),
            json!([{"orderId": "a"}, {"orderId": "b"}])
        );
    }

    #[test]
    fn null_is_empty() {
        let log = ExtraDataLog::from_value(Value::Null);
        assert!(log.is_empty());
        assert_eq!(log.latest(), None);
    }
}
