// SPDX-License-Identifier: MIT

use super::model::Rule;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage for rules. Reads hand out copies, so a caller holding a rule
/// works on a snapshot unaffected by later saves.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn get(&self, id: &str) -> Option<Rule>;

    async fn list(&self) -> Vec<Rule>;

    /// Insert or replace by id
    async fn save(&self, rule: Rule);

    async fn delete(&self, id: &str) -> Option<Rule>;
}

#[derive(Clone, Default)]
pub struct InMemoryRuleRepository {
    rules: Arc<RwLock<HashMap<String, Rule>>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn get(&self, id: &str) -> Option<Rule> {
        self.rules.read().await.get(id).cloned()
    }

    async fn list(&self) -> Vec<Rule> {
        let rules = self.rules.read().await;
        let mut list: Vec<Rule> = rules.values().cloned().collect();
        list.sort_by(|a, b| {
            a.definition
                .priority
                .cmp(&b.definition.priority)
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    async fn save(&self, rule: Rule) {
        self.rules.write().await.insert(rule.id.clone(), rule);
    }

    async fn delete(&self, id: &str) -> Option<Rule> {
        self.rules.write().await.remove(id)
    }
}
