// SPDX-License-Identifier: MIT

//! Rule engine
//!
//! Evaluates incoming events against every rule, enforces the approval
//! lifecycle and silence windows, and runs the workflows of rules that fire.
//! Each matching rule runs on its own snapshot taken when the event arrives.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::remedy::actions::ActionRegistry;
use crate::remedy::condition::{evaluate, Event};
use crate::remedy::retry::RetryPolicyStore;
use crate::remedy::rule::{
    ApprovalStatus, Authorizer, Rule, RuleDefinition, RuleRepository, SilenceController,
    SilenceDecision,
};
use crate::remedy::workflow::{WorkflowExecutor, WorkflowKind, WorkflowRun};
use crate::runtime::error::{ConfigError, LifecycleError, RemedyError};

/// Workflow runs started by one trigger
#[derive(Debug, Clone)]
pub struct RuleExecution {
    pub rule_id: String,
    pub remediation: WorkflowRun,
    /// Present when verification is enabled and remediation succeeded
    pub verification: Option<WorkflowRun>,
}

impl RuleExecution {
    pub fn succeeded(&self) -> bool {
        self.remediation.succeeded()
            && self.verification.as_ref().map_or(true, |v| v.succeeded())
    }
}

/// What one event did to one rule
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// Rule is inactive
    Disabled,
    NotMatched,
    /// Matched, but the rule is not approved
    Inert(ApprovalStatus),
    /// Matched inside the silence window of an earlier trigger
    Silenced { until: DateTime<Utc> },
    Fired(RuleExecution),
}

impl TriggerOutcome {
    pub fn fired(&self) -> bool {
        matches!(self, TriggerOutcome::Fired(_))
    }
}

#[derive(Debug, Clone)]
pub struct RuleTrigger {
    pub rule_id: String,
    pub outcome: TriggerOutcome,
}

pub struct RuleEngine {
    rules: Arc<dyn RuleRepository>,
    policies: RetryPolicyStore,
    executor: WorkflowExecutor,
    silence: SilenceController,
    authorizer: Arc<dyn Authorizer>,
    actions: Option<ActionRegistry>,
    writes: Mutex<()>,
}

impl RuleEngine {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        policies: RetryPolicyStore,
        executor: WorkflowExecutor,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            rules,
            policies,
            executor,
            silence: SilenceController::new(),
            authorizer,
            actions: None,
            writes: Mutex::new(()),
        }
    }

    /// Check action references against `actions` when rules are authored
    pub fn with_action_catalog(mut self, actions: ActionRegistry) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn policies(&self) -> &RetryPolicyStore {
        &self.policies
    }

    pub fn silence(&self) -> &SilenceController {
        &self.silence
    }

    pub async fn handle_event(&self, event: &Event) -> Vec<RuleTrigger> {
        self.handle_event_at(event, Utc::now()).await
    }

    /// Evaluate `event` against every rule as of `now`
    pub async fn handle_event_at(&self, event: &Event, now: DateTime<Utc>) -> Vec<RuleTrigger> {
        let rules = self.rules.list().await;
        log::debug!("Evaluating event against {} rules", rules.len());

        let evaluations = rules.into_iter().map(|rule| async move {
            let outcome = self.trigger(&rule, event, now).await;
            RuleTrigger {
                rule_id: rule.id,
                outcome,
            }
        });
        join_all(evaluations).await
    }

    async fn trigger(&self, rule: &Rule, event: &Event, now: DateTime<Utc>) -> TriggerOutcome {
        if !rule.definition.enabled {
            return TriggerOutcome::Disabled;
        }
        if !evaluate(&rule.definition.condition, event) {
            return TriggerOutcome::NotMatched;
        }
        if rule.status() != ApprovalStatus::Approved {
            let err = LifecycleError::NotExecutable {
                rule_id: rule.id.clone(),
                status: rule.status().to_string(),
            };
            log::warn!("Skipping matched rule: {}", err);
            return TriggerOutcome::Inert(rule.status());
        }

        match self
            .silence
            .try_fire(&rule.id, &rule.definition.silence, now)
            .await
        {
            SilenceDecision::Silenced { until } => {
                log::info!("Rule '{}' matched but is silenced until {}", rule.id, until);
                TriggerOutcome::Silenced { until }
            }
            SilenceDecision::Fire => {
                log::info!("Rule '{}' ({}) fired", rule.id, rule.definition.name);
                TriggerOutcome::Fired(self.execute(rule, event).await)
            }
        }
    }

    async fn execute(&self, rule: &Rule, event: &Event) -> RuleExecution {
        let context = json!({
            "rule_id": rule.id,
            "rule_name": rule.definition.name,
            "priority": rule.definition.priority,
            "event": event.to_json(),
        });

        let remediation = self
            .executor
            .run(
                WorkflowKind::Remediation,
                &rule.definition.remediation,
                &self.policies,
                &context,
            )
            .await;

        let verification = if rule.definition.verification_enabled && remediation.succeeded() {
            Some(
                self.executor
                    .run(
                        WorkflowKind::Verification,
                        &rule.definition.verification,
                        &self.policies,
                        &context,
                    )
                    .await,
            )
        } else {
            if rule.definition.verification_enabled {
                log::info!(
                    "Rule '{}': remediation failed, skipping verification",
                    rule.id
                );
            }
            None
        };

        RuleExecution {
            rule_id: rule.id.clone(),
            remediation,
            verification,
        }
    }

    pub async fn get_rule(&self, id: &str) -> Option<Rule> {
        self.rules.get(id).await
    }

    pub async fn rules(&self) -> Vec<Rule> {
        self.rules.list().await
    }

    /// Store a new draft rule after full validation
    pub async fn create_rule(
        &self,
        id: &str,
        definition: RuleDefinition,
        actor: &str,
    ) -> Result<Rule, RemedyError> {
        definition
            .validate(&self.policies, self.actions.as_ref())
            .await?;

        let _guard = self.writes.lock().await;
        if self.rules.get(id).await.is_some() {
            return Err(ConfigError::DuplicateRule(id.to_string()).into());
        }
        let rule = Rule::new(id, definition, actor, Utc::now());
        self.rules.save(rule.clone()).await;
        log::info!("Rule '{}' created by {}", id, actor);
        Ok(rule)
    }

    /// Replace a rule's definition; an approved rule needs approval again
    pub async fn edit_rule(
        &self,
        id: &str,
        definition: RuleDefinition,
        actor: &str,
    ) -> Result<Rule, RemedyError> {
        definition
            .validate(&self.policies, self.actions.as_ref())
            .await?;
        self.update(id, |rule| Ok(rule.edit(actor, definition, Utc::now())?))
            .await
    }

    pub async fn submit(&self, id: &str, actor: &str) -> Result<Rule, RemedyError> {
        self.update(id, |rule| Ok(rule.submit(actor, Utc::now())?))
            .await
    }

    pub async fn resubmit(&self, id: &str, actor: &str) -> Result<Rule, RemedyError> {
        self.update(id, |rule| Ok(rule.resubmit(actor, Utc::now())?))
            .await
    }

    pub async fn approve(&self, id: &str, actor: &str) -> Result<Rule, RemedyError> {
        self.authorize(actor)?;
        self.update(id, |rule| Ok(rule.approve(actor, Utc::now())?))
            .await
    }

    pub async fn reject(&self, id: &str, actor: &str, reason: &str) -> Result<Rule, RemedyError> {
        self.authorize(actor)?;
        self.update(id, |rule| Ok(rule.reject(actor, reason, Utc::now())?))
            .await
    }

    /// Toggle the active flag; takes effect for the next event
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<Rule, RemedyError> {
        self.update(id, |rule| {
            rule.definition.enabled = enabled;
            Ok(())
        })
        .await
    }

    /// Remove a rule; runs already in flight complete on their snapshot
    pub async fn delete_rule(&self, id: &str) -> Result<Rule, RemedyError> {
        let _guard = self.writes.lock().await;
        let rule = self
            .rules
            .delete(id)
            .await
            .ok_or_else(|| LifecycleError::RuleNotFound(id.to_string()))?;
        self.silence.clear(id).await;
        log::info!("Rule '{}' deleted", id);
        Ok(rule)
    }

    fn authorize(&self, actor: &str) -> Result<(), LifecycleError> {
        if self.authorizer.can_approve(actor) {
            Ok(())
        } else {
            log::warn!("Actor '{}' denied approval capability", actor);
            Err(LifecycleError::Unauthorized(actor.to_string()))
        }
    }

    async fn update<F>(&self, id: &str, f: F) -> Result<Rule, RemedyError>
    where
        F: FnOnce(&mut Rule) -> Result<(), RemedyError>,
    {
        let _guard = self.writes.lock().await;
        let mut rule = self
            .rules
            .get(id)
            .await
            .ok_or_else(|| LifecycleError::RuleNotFound(id.to_string()))?;
        let before = rule.status();
        f(&mut rule)?;
        if rule.status() != before {
            log::info!("Rule '{}': {} -> {}", id, before, rule.status());
        }
        self.rules.save(rule.clone()).await;
        Ok(rule)
    }
}
