// SPDX-License-Identifier: MIT

//! Engine builder - turns a loaded configuration into a ready `RuleEngine`
//!
//! Every rule is validated here, so configuration errors surface at load
//! time rather than when an event arrives.

use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::loader::RemedyLoader;
use super::types::{ActionKind, DestinationKind, RemedyConfig, RuleConfig};
use crate::remedy::actions::{
    ActionRegistry, HttpAction, LogNotifier, MonitorAction, NotificationRouter, NotifyAction,
    ScriptAction, WebhookNotifier,
};
use crate::remedy::engine::RuleEngine;
use crate::remedy::retry::RetryPolicyStore;
use crate::remedy::rule::{
    AllowListAuthorizer, ApprovalStatus, Authorizer, InMemoryRuleRepository, Rule,
    RuleDefinition, RuleRepository,
};
use crate::remedy::workflow::WorkflowExecutor;
use crate::runtime::error::{ConfigError, LifecycleError, RemedyError};

/// High-level builder for constructing an engine from a configuration
pub struct Builder {
    config: RemedyConfig,
}

impl Builder {
    pub fn new(config: RemedyConfig) -> Self {
        Self { config }
    }

    /// Load and wrap a YAML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RemedyError> {
        let config = RemedyLoader::new().load_config(path)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &RemedyConfig {
        &self.config
    }

    pub async fn build_policies(&self) -> Result<RetryPolicyStore, RemedyError> {
        let store = RetryPolicyStore::new();
        for policy in &self.config.retry_policies {
            if store.contains(&policy.id).await {
                log::warn!("Retry policy '{}' defined twice, keeping the last", policy.id);
            }
            store.insert(policy.clone()).await?;
        }
        Ok(store)
    }

    /// Register every configured action; notify steps dispatch through `notifier`
    pub async fn build_actions(
        &self,
        notifier: &Arc<NotificationRouter>,
    ) -> Result<ActionRegistry, ConfigError> {
        let registry = ActionRegistry::new();
        for def in &self.config.actions {
            match &def.kind {
                ActionKind::Http(endpoint) => {
                    registry
                        .register(Arc::new(HttpAction::new(
                            &def.id,
                            &def.description,
                            endpoint.clone(),
                        )))
                        .await
                }
                ActionKind::Script(script) => {
                    registry
                        .register(Arc::new(ScriptAction::new(
                            &def.id,
                            &def.description,
                            script.clone(),
                        )))
                        .await
                }
                ActionKind::Notify { destination } => {
                    if !notifier.contains(destination) {
                        return Err(ConfigError::UnknownDestination(destination.clone()));
                    }
                    registry
                        .register(Arc::new(NotifyAction::new(
                            &def.id,
                            &def.description,
                            destination,
                            notifier.clone(),
                        )))
                        .await
                }
                ActionKind::NoAction => {
                    registry
                        .register(Arc::new(MonitorAction::new(&def.id, &def.description)))
                        .await
                }
            }
        }
        Ok(registry)
    }

    pub fn build_notifier(&self) -> NotificationRouter {
        self.config
            .notifications
            .iter()
            .fold(NotificationRouter::new(), |router, dest| match &dest.kind {
                DestinationKind::Log => router.route(&dest.name, Arc::new(LogNotifier)),
                DestinationKind::Webhook { url } => {
                    router.route(&dest.name, Arc::new(WebhookNotifier::new(url)))
                }
            })
    }

    /// Build the engine with every configured rule loaded and validated
    pub async fn build(&self) -> Result<RuleEngine, RemedyError> {
        let policies = self.build_policies().await?;
        let notifier = Arc::new(self.build_notifier());
        let actions = self.build_actions(&notifier).await?;
        let authorizer = AllowListAuthorizer::new(self.config.admins.iter().cloned());
        let repository = Arc::new(InMemoryRuleRepository::new());

        let mut seen = HashSet::new();
        for rule_config in &self.config.rules {
            if !seen.insert(rule_config.id.as_str()) {
                return Err(ConfigError::DuplicateRule(rule_config.id.clone()).into());
            }
            let definition = rule_config.to_definition()?;
            definition.validate(&policies, Some(&actions)).await?;
            check_destinations(&definition, &notifier)?;

            let rule = seed_rule(rule_config, definition, &authorizer)?;
            log::info!(
                "Loaded rule '{}' ({}) as {}",
                rule.id,
                rule.definition.name,
                rule.status()
            );
            repository.save(rule).await;
        }

        log::info!(
            "Built engine: {} rules, {} retry policies, {} actions",
            self.config.rules.len(),
            policies.len().await,
            actions.ids().await.len()
        );

        let executor = WorkflowExecutor::new(Arc::new(actions.clone())).with_notifier(notifier);

        Ok(
            RuleEngine::new(repository, policies, executor, Arc::new(authorizer))
                .with_action_catalog(actions),
        )
    }
}

fn check_destinations(
    definition: &RuleDefinition,
    notifier: &NotificationRouter,
) -> Result<(), ConfigError> {
    for (_, graph) in definition.workflows() {
        if let Some(notification) = &graph.notification {
            if !notifier.contains(&notification.destination) {
                return Err(ConfigError::UnknownDestination(
                    notification.destination.clone(),
                ));
            }
        }
    }
    Ok(())
}

/// New rule brought to its configured status through the regular
/// transitions, with the same capability and reason checks as the engine
fn seed_rule(
    config: &RuleConfig,
    definition: RuleDefinition,
    authorizer: &dyn Authorizer,
) -> Result<Rule, RemedyError> {
    let now = Utc::now();
    let author = config.created_by.as_str();
    let mut rule = Rule::new(&config.id, definition, author, now);

    if config.status != ApprovalStatus::Draft {
        rule.submit(author, now)?;
    }
    match config.status {
        ApprovalStatus::Approved => {
            let approver = config.approved_by.as_deref().unwrap_or(author);
            check_capability(authorizer, approver)?;
            rule.approve(approver, now)?;
        }
        ApprovalStatus::Rejected => {
            let rejecter = config.rejected_by.as_deref().unwrap_or(author);
            check_capability(authorizer, rejecter)?;
            let reason = config.rejection_reason.as_deref().unwrap_or("");
            rule.reject(rejecter, reason, now)?;
        }
        ApprovalStatus::Draft | ApprovalStatus::PendingApproval => {}
    }
    Ok(rule)
}

fn check_capability(authorizer: &dyn Authorizer, actor: &str) -> Result<(), LifecycleError> {
    if authorizer.can_approve(actor) {
        Ok(())
    } else {
        log::warn!("Configured actor '{}' lacks approval capability", actor);
        Err(LifecycleError::Unauthorized(actor.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remedy::config::loader::RemedyLoader;

    const BASE: &str = r#"
admins: [admin]
retry_policies:
  - id: quick
    max_retries: 0
    retry_interval_seconds: 1
    timeout_seconds: 5
actions:
  - id: noop
    kind: script
    command: "true"
notifications:
  - name: ops
    kind: log
"#;

    fn config(rules: &str) -> RemedyConfig {
        RemedyLoader::parse_yaml(&format!("{}{}", BASE, rules)).unwrap()
    }

    #[tokio::test]
    async fn test_build_seeds_statuses() {
        let config = config(
            r#"
rules:
  - id: approved
    name: Approved
    status: approved
    approved_by: admin
    condition: 'severity == "critical"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
  - id: rejected
    name: Rejected
    status: rejected
    rejected_by: admin
    rejection_reason: too broad
    condition: 'severity == "low"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
  - id: draft
    name: Draft
    condition: 'severity == "low"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
"#,
        );
        let engine = Builder::new(config).build().await.unwrap();

        let approved = engine.get_rule("approved").await.unwrap();
        assert_eq!(approved.status(), ApprovalStatus::Approved);
        assert_eq!(approved.approval.approved_by.as_deref(), Some("admin"));

        let rejected = engine.get_rule("rejected").await.unwrap();
        assert_eq!(rejected.status(), ApprovalStatus::Rejected);
        assert_eq!(rejected.approval.rejected_by.as_deref(), Some("admin"));
        assert_eq!(rejected.approval.rejection_reason.as_deref(), Some("too broad"));

        assert_eq!(
            engine.get_rule("draft").await.unwrap().status(),
            ApprovalStatus::Draft
        );
    }

    #[tokio::test]
    async fn test_build_requires_rejection_reason() {
        let config = config(
            r#"
rules:
  - id: rejected
    name: Rejected
    status: rejected
    rejected_by: admin
    condition: 'severity == "low"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
"#,
        );
        let err = Builder::new(config).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Lifecycle(LifecycleError::MissingReason)
        ));
    }

    #[tokio::test]
    async fn test_build_requires_admin_approver() {
        let approved_by_outsider = config(
            r#"
rules:
  - id: approved
    name: Approved
    status: approved
    approved_by: mallory
    condition: 'severity == "critical"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
"#,
        );
        let err = Builder::new(approved_by_outsider).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Lifecycle(LifecycleError::Unauthorized(actor)) if actor == "mallory"
        ));

        // The default approver is the author, "config", which is no admin
        let approved_by_default = config(
            r#"
rules:
  - id: approved
    name: Approved
    status: approved
    condition: 'severity == "critical"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
"#,
        );
        let err = Builder::new(approved_by_default).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Lifecycle(LifecycleError::Unauthorized(actor)) if actor == "config"
        ));
    }

    #[tokio::test]
    async fn test_build_requires_admin_rejecter() {
        let config = config(
            r#"
rules:
  - id: rejected
    name: Rejected
    status: rejected
    rejected_by: mallory
    rejection_reason: noisy
    condition: 'severity == "low"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
"#,
        );
        let err = Builder::new(config).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Lifecycle(LifecycleError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_rql() {
        let config = config(
            r#"
rules:
  - id: bad
    name: Bad
    condition: 'bogus_field equals "x"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
"#,
        );
        let err = Builder::new(config).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Config(ConfigError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_unknown_action() {
        let config = config(
            r#"
rules:
  - id: bad
    name: Bad
    condition: 'severity == "critical"'
    remediation:
      steps:
        - {step_number: 1, action_ref: missing, retry_policy_id: quick}
"#,
        );
        let err = Builder::new(config).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Config(ConfigError::UnknownAction { .. })
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_backward_jump() {
        let config = config(
            r#"
rules:
  - id: bad
    name: Bad
    condition: 'severity == "critical"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
        - {step_number: 2, action_ref: noop, retry_policy_id: quick, on_failure: "jump:1"}
"#,
        );
        let err = Builder::new(config).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Config(ConfigError::InvalidJumpTarget { step: 2, target: 1 })
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_unknown_destination() {
        let config = config(
            r#"
rules:
  - id: bad
    name: Bad
    condition: 'severity == "critical"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
      notification:
        destination: nowhere
"#,
        );
        let err = Builder::new(config).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Config(ConfigError::UnknownDestination(_))
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_duplicate_rule() {
        let config = config(
            r#"
rules:
  - id: same
    name: One
    condition: 'severity == "critical"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
  - id: same
    name: Two
    condition: 'severity == "low"'
    remediation:
      steps:
        - {step_number: 1, action_ref: noop, retry_policy_id: quick}
"#,
        );
        let err = Builder::new(config).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Config(ConfigError::DuplicateRule(_))
        ));
    }

    #[tokio::test]
    async fn test_notify_and_monitor_steps() {
        let config = RemedyLoader::parse_yaml(
            r#"
admins: [admin]
retry_policies:
  - id: quick
    retry_interval_seconds: 1
    timeout_seconds: 5
actions:
  - id: tell_ops
    kind: notify
    destination: ops
  - id: watch
    kind: no_action
notifications:
  - name: ops
    kind: log
rules:
  - id: watch-only
    name: Watch only
    status: approved
    approved_by: admin
    condition: 'severity == "critical"'
    remediation:
      steps:
        - {step_number: 1, action_ref: tell_ops, retry_policy_id: quick}
        - {step_number: 2, action_ref: watch, retry_policy_id: quick}
"#,
        )
        .unwrap();
        let engine = Builder::new(config).build().await.unwrap();

        let event = crate::remedy::condition::Event::new().with("severity", "critical");
        let triggers = engine.handle_event(&event).await;
        match &triggers[0].outcome {
            crate::remedy::engine::TriggerOutcome::Fired(execution) => {
                let run = &execution.remediation;
                assert!(run.succeeded());
                assert_eq!(run.executed_steps(), vec![1, 2]);
                assert_eq!(
                    run.step_results[0].output.as_ref().unwrap()["destination"],
                    "ops"
                );
                assert_eq!(
                    run.step_results[1].output.as_ref().unwrap()["monitored"],
                    true
                );
            }
            other => panic!("Expected fired, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_notify_action_requires_known_destination() {
        let config = RemedyLoader::parse_yaml(
            r#"
actions:
  - id: tell_ops
    kind: notify
    destination: nowhere
"#,
        )
        .unwrap();
        let builder = Builder::new(config);
        let notifier = Arc::new(builder.build_notifier());
        let err = builder.build_actions(&notifier).await.err().unwrap();
        assert_eq!(err, ConfigError::UnknownDestination("nowhere".to_string()));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_policy() {
        let config = RemedyLoader::parse_yaml(
            r#"
retry_policies:
  - id: broken
    retry_interval_seconds: 0
    timeout_seconds: 5
"#,
        )
        .unwrap();
        let err = Builder::new(config).build().await.err().unwrap();
        assert!(matches!(
            err,
            RemedyError::Config(ConfigError::InvalidRetryPolicy { .. })
        ));
    }
}
