// SPDX-License-Identifier: MIT

//! Rule data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::remedy::actions::ActionRegistry;
use crate::remedy::condition::ConditionNode;
use crate::remedy::retry::RetryPolicyStore;
use crate::remedy::workflow::{WorkflowGraph, WorkflowKind};
use crate::runtime::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Draft,
    PendingApproval,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Draft => "draft",
            ApprovalStatus::PendingApproval => "pending_approval",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current approval state plus who moved it there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalInfo {
    pub status: ApprovalStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl ApprovalInfo {
    pub fn new(created_by: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            status: ApprovalStatus::Draft,
            created_by: created_by.to_string(),
            created_at,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalEventKind {
    Created,
    SubmittedForApproval,
    Approved,
    Rejected,
    Resubmitted,
}

/// Audit trail entry appended on every lifecycle transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub kind: ApprovalEventKind,
    pub actor: String,
    pub at: DateTime<Utc>,
    pub previous_status: Option<ApprovalStatus>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilenceUnit {
    #[default]
    Minutes,
    Hours,
    Days,
}

fn default_true() -> bool {
    true
}

fn default_silence_duration() -> u64 {
    30
}

/// Minimum interval between two triggers of the same rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilenceWindow {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_silence_duration")]
    pub duration: u64,
    #[serde(default)]
    pub unit: SilenceUnit,
}

impl Default for SilenceWindow {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: default_silence_duration(),
            unit: SilenceUnit::Minutes,
        }
    }
}

impl SilenceWindow {
    pub fn minutes(duration: u64) -> Self {
        Self {
            enabled: true,
            duration,
            unit: SilenceUnit::Minutes,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Window length, `None` when silencing is off
    pub fn length(&self) -> Option<chrono::Duration> {
        if !self.enabled {
            return None;
        }
        let n = i64::try_from(self.duration).unwrap_or(i64::MAX);
        let length = match self.unit {
            SilenceUnit::Minutes => chrono::Duration::try_minutes(n),
            SilenceUnit::Hours => chrono::Duration::try_hours(n),
            SilenceUnit::Days => chrono::Duration::try_days(n),
        };
        Some(length.unwrap_or(chrono::Duration::MAX))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.duration == 0 {
            return Err(ConfigError::InvalidSilenceDuration);
        }
        Ok(())
    }
}

/// Everything an author edits; approval state lives beside it on `Rule`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    /// Inactive rules never trigger, whatever their approval status
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub condition: ConditionNode,
    pub remediation: WorkflowGraph,
    #[serde(default)]
    pub verification_enabled: bool,
    #[serde(default)]
    pub verification: WorkflowGraph,
    #[serde(default)]
    pub silence: SilenceWindow,
}

impl RuleDefinition {
    pub fn new(name: &str, condition: ConditionNode, remediation: WorkflowGraph) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            priority: Priority::default(),
            enabled: true,
            condition,
            remediation,
            verification_enabled: false,
            verification: WorkflowGraph::default(),
            silence: SilenceWindow::default(),
        }
    }

    pub fn with_verification(mut self, verification: WorkflowGraph) -> Self {
        self.verification_enabled = true;
        self.verification = verification;
        self
    }

    pub fn with_silence(mut self, silence: SilenceWindow) -> Self {
        self.silence = silence;
        self
    }

    /// Workflows that run when the rule fires, in order
    pub fn workflows(&self) -> Vec<(WorkflowKind, &WorkflowGraph)> {
        let mut workflows = vec![(WorkflowKind::Remediation, &self.remediation)];
        if self.verification_enabled {
            workflows.push((WorkflowKind::Verification, &self.verification));
        }
        workflows
    }

    /// Checks that need no external store
    pub fn validate_structure(&self) -> Result<(), ConfigError> {
        self.condition.validate()?;
        for (kind, graph) in self.workflows() {
            if graph.is_empty() {
                return Err(ConfigError::EmptyWorkflow(kind.to_string()));
            }
            graph.validate_structure()?;
        }
        self.silence.validate()
    }

    /// Structural checks plus retry policy and action references
    pub async fn validate(
        &self,
        policies: &RetryPolicyStore,
        actions: Option<&ActionRegistry>,
    ) -> Result<(), ConfigError> {
        self.validate_structure()?;
        for (_, graph) in self.workflows() {
            graph.validate(policies, actions).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(flatten)]
    pub definition: RuleDefinition,
    pub approval: ApprovalInfo,
    #[serde(default)]
    pub history: Vec<ApprovalEvent>,
}

impl Rule {
    /// New draft rule with a `created` audit entry
    pub fn new(id: &str, definition: RuleDefinition, created_by: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            definition,
            approval: ApprovalInfo::new(created_by, now),
            history: vec![ApprovalEvent {
                kind: ApprovalEventKind::Created,
                actor: created_by.to_string(),
                at: now,
                previous_status: None,
                reason: None,
            }],
        }
    }

    pub fn status(&self) -> ApprovalStatus {
        self.approval.status
    }

    /// Approved and enabled
    pub fn is_executable(&self) -> bool {
        self.approval.status == ApprovalStatus::Approved && self.definition.enabled
    }
}
