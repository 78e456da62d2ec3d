// SPDX-License-Identifier: MIT

//! YAML schema for engine configuration files

use serde::{Deserialize, Serialize};

use crate::remedy::actions::{HttpEndpoint, ScriptCommand};
use crate::remedy::condition::{parse, ConditionNode};
use crate::remedy::retry::RetryPolicy;
use crate::remedy::rule::{ApprovalStatus, Priority, RuleDefinition, SilenceWindow};
use crate::remedy::workflow::WorkflowGraph;
use crate::runtime::error::ConfigError;

/// Top-level configuration file
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RemedyConfig {
    /// Actor ids allowed to approve and reject rules
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub retry_policies: Vec<RetryPolicy>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
    #[serde(default)]
    pub notifications: Vec<DestinationConfig>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Entry of the script/API repository
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActionDefinition {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: ActionKind,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    Http(HttpEndpoint),
    Script(ScriptCommand),
    /// Send the trigger context to a configured destination
    Notify { destination: String },
    /// Monitor only
    NoAction,
}

/// Named notification destination
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DestinationConfig {
    pub name: String,
    #[serde(flatten)]
    pub kind: DestinationKind,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DestinationKind {
    Log,
    Webhook { url: String },
}

/// Condition as RQL text or as an explicit tree
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum ConditionConfig {
    Rql(String),
    Tree(ConditionNode),
}

impl ConditionConfig {
    pub fn to_node(&self) -> Result<ConditionNode, ConfigError> {
        match self {
            ConditionConfig::Rql(text) => parse(text).into_result(),
            ConditionConfig::Tree(node) => Ok(node.clone()),
        }
    }
}

fn default_author() -> String {
    "config".to_string()
}

fn default_true() -> bool {
    true
}

/// Rule as written in a configuration file
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub condition: ConditionConfig,
    pub remediation: WorkflowGraph,
    #[serde(default)]
    pub verification_enabled: bool,
    #[serde(default)]
    pub verification: WorkflowGraph,
    #[serde(default)]
    pub silence: SilenceWindow,
    /// Status to bring the rule to, through the regular transitions
    #[serde(default)]
    pub status: ApprovalStatus,
    #[serde(default = "default_author")]
    pub created_by: String,
    /// Approver recorded for `approved` rules, defaults to `created_by`
    pub approved_by: Option<String>,
    /// Rejecting actor for `rejected` rules, defaults to `created_by`
    pub rejected_by: Option<String>,
    /// Required for `rejected` rules
    pub rejection_reason: Option<String>,
}

impl RuleConfig {
    pub fn to_definition(&self) -> Result<RuleDefinition, ConfigError> {
        Ok(RuleDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            priority: self.priority,
            enabled: self.enabled,
            condition: self.condition.to_node()?,
            remediation: self.remediation.clone(),
            verification_enabled: self.verification_enabled,
            verification: self.verification.clone(),
            silence: self.silence,
        })
    }
}
