// SPDX-License-Identifier: MIT

use crate::runtime::action::{Action, ActionInvoker};
use crate::runtime::error::ActionError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Script and API repository keyed by action reference
#[derive(Clone)]
pub struct ActionRegistry {
    actions: Arc<RwLock<HashMap<String, Arc<dyn Action>>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, action: Arc<dyn Action>) {
        let mut actions = self.actions.write().await;
        actions.insert(action.id().to_string(), action);
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn Action>> {
        let actions = self.actions.read().await;
        actions.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.actions.read().await.contains_key(id)
    }

    /// Registered references, sorted
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.actions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionInvoker for ActionRegistry {
    async fn invoke(&self, action_ref: &str, context: &Value) -> Result<Value, ActionError> {
        let action = self
            .get(action_ref)
            .await
            .ok_or_else(|| ActionError::NotFound(action_ref.to_string()))?;
        action.execute(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A mock action for testing
    struct MockAction {
        id: String,
        description: String,
    }

    impl MockAction {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                description: format!("Mock action: {}", id),
            }
        }
    }

    #[async_trait]
    impl Action for MockAction {
        fn id(&self) -> &str {
            &self.id
        }

        fn description(&self) -> &str {
            &self.description
        }

        async fn execute(&self, context: &Value) -> Result<Value, ActionError> {
            Ok(json!({"action": self.id, "rule": context["rule_id"]}))
        }
    }

    #[tokio::test]
    async fn test_register_and_get_action() {
        let registry = ActionRegistry::new();
        registry.register(Arc::new(MockAction::new("restart"))).await;

        let retrieved = registry.get("restart").await;
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().id(), "restart");
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_invoke_by_reference() {
        let registry = ActionRegistry::new();
        registry.register(Arc::new(MockAction::new("restart"))).await;

        let output = registry
            .invoke("restart", &json!({"rule_id": "r1"}))
            .await
            .unwrap();
        assert_eq!(output["rule"], "r1");
    }

    #[tokio::test]
    async fn test_invoke_unknown_reference() {
        let registry = ActionRegistry::new();
        let err = registry.invoke("missing", &json!({})).await.unwrap_err();
        assert_eq!(err, ActionError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_registry_is_clone() {
        let registry = ActionRegistry::new();
        let cloned = registry.clone();

        cloned.register(Arc::new(MockAction::new("cleanup"))).await;
        assert!(registry.contains("cleanup").await);
        assert_eq!(registry.ids().await, vec!["cleanup"]);
    }
}
