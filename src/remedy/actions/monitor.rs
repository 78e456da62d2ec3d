//! Monitor-only steps

use crate::runtime::action::Action;
use crate::runtime::error::ActionError;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Records that the rule fired and always succeeds
pub struct MonitorAction {
    id: String,
    description: String,
}

impl MonitorAction {
    pub fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
        }
    }
}

#[async_trait]
impl Action for MonitorAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, context: &Value) -> Result<Value, ActionError> {
        log::info!("Monitor step '{}': {}", self.id, context);
        Ok(json!({ "monitored": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_monitor_always_succeeds() {
        let action = MonitorAction::new("watch", "Monitor only");
        let output = action.execute(&json!({"rule_id": "r1"})).await.unwrap();
        assert_eq!(output, json!({"monitored": true}));
    }
}
