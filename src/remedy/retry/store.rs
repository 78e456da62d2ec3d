// SPDX-License-Identifier: MIT

use super::policy::RetryPolicy;
use crate::runtime::error::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Id-keyed retry policies shared by every step that references them
#[derive(Clone)]
pub struct RetryPolicyStore {
    policies: Arc<RwLock<HashMap<String, Arc<RetryPolicy>>>>,
}

impl RetryPolicyStore {
    pub fn new() -> Self {
        Self {
            policies: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add or replace a policy. Steps see the new value on their next run.
    pub async fn insert(&self, policy: RetryPolicy) -> Result<(), ConfigError> {
        policy.validate()?;
        let mut policies = self.policies.write().await;
        policies.insert(policy.id.clone(), Arc::new(policy));
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Arc<RetryPolicy>> {
        let policies = self.policies.read().await;
        policies.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.policies.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.policies.read().await.len()
    }
}

impl Default for RetryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}
