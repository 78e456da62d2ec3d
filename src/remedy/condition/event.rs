// SPDX-License-Identifier: MIT

//! Event records evaluated against rule conditions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Scalar value carried by an event field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Number(f64),
    Text(String),
}

impl EventValue {
    /// String form used by the string operators
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            EventValue::Text(s) => Cow::Borrowed(s.as_str()),
            EventValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }

    /// Numeric form used by the numeric operators
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EventValue::Number(n) => Some(*n),
            EventValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl From<&str> for EventValue {
    fn from(s: &str) -> Self {
        EventValue::Text(s.to_string())
    }
}

impl From<String> for EventValue {
    fn from(s: String) -> Self {
        EventValue::Text(s)
    }
}

impl From<f64> for EventValue {
    fn from(n: f64) -> Self {
        EventValue::Number(n)
    }
}

impl From<i64> for EventValue {
    fn from(n: i64) -> Self {
        EventValue::Number(n as f64)
    }
}

/// Incoming operational event: field name to scalar value.
///
/// Any field name is accepted. Booleans are kept in their string form;
/// nulls, arrays and objects are dropped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HashMap<String, Value>")]
pub struct Event {
    fields: HashMap<String, EventValue>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: &str, value: impl Into<EventValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<EventValue>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&EventValue> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert to a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        EventValue::Text(s) => Value::String(s.clone()),
                        EventValue::Number(n) => serde_json::Number::from_f64(*n)
                            .map(Value::Number)
                            .unwrap_or(Value::Null),
                    };
                    (k.clone(), value)
                })
                .collect(),
        )
    }
}

impl From<HashMap<String, Value>> for Event {
    fn from(raw: HashMap<String, Value>) -> Self {
        let fields = raw
            .into_iter()
            .filter_map(|(k, v)| {
                let value = match v {
                    Value::String(s) => EventValue::Text(s),
                    Value::Number(n) => EventValue::Number(n.as_f64()?),
                    Value::Bool(b) => EventValue::Text(b.to_string()),
                    _ => {
                        log::debug!("Dropping non-scalar event field '{}'", k);
                        return None;
                    }
                };
                Some((k, value))
            })
            .collect();
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_number_text_form() {
        assert_eq!(EventValue::Number(5.0).as_text(), "5");
        assert_eq!(EventValue::Number(2.5).as_text(), "2.5");
    }

    #[test]
    fn test_text_number_form() {
        assert_eq!(EventValue::from("42").as_number(), Some(42.0));
        assert_eq!(EventValue::from("high").as_number(), None);
    }

    #[test]
    fn test_deserialize_lenient() {
        let event: Event = serde_json::from_str(
            r#"{"severity": "critical", "count": 12, "ack": true, "tags": ["a"], "owner": null}"#,
        )
        .unwrap();

        assert_eq!(event.len(), 3);
        assert_eq!(event.get("severity"), Some(&EventValue::from("critical")));
        assert_eq!(event.get("count"), Some(&EventValue::Number(12.0)));
        assert_eq!(event.get("ack"), Some(&EventValue::from("true")));
        assert!(event.get("tags").is_none());
    }

    #[test]
    fn test_to_json() {
        let event = Event::new().with("severity", "high").with("count", 3i64);
        let json = event.to_json();
        assert_eq!(json["severity"], "high");
        assert_eq!(json["count"], 3.0);
    }
}
