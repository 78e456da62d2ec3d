//! Workflow executor
//!
//! Drives one step graph to completion for a triggering event. Steps run one
//! at a time; each attempt is bounded by the step's retry policy timeout and
//! failed attempts back off according to the same policy.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::graph::WorkflowGraph;
use super::types::{StepRoute, WorkflowKind, WorkflowStep};
use crate::remedy::retry::{AttemptOutcome, RetryPolicyStore};
use crate::runtime::action::ActionInvoker;
use crate::runtime::error::ActionError;
use crate::runtime::notifier::{NotificationTrigger, Notifier};

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// Outcome of one step after its retries
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step_number: u32,
    pub action_ref: String,
    pub outcome: AttemptOutcome,
    /// Attempts made, 0 when the step could not start
    pub attempts: u32,
    pub output: Option<Value>,
    pub error: Option<String>,
    /// Ran as the recovery step
    pub recovery: bool,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Record of one workflow run
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    pub run_id: Uuid,
    pub kind: WorkflowKind,
    pub status: RunStatus,
    pub step_results: Vec<StepResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Trigger of the notification dispatched for this run, if any
    pub notified: Option<NotificationTrigger>,
}

impl WorkflowRun {
    /// Step numbers in execution order
    pub fn executed_steps(&self) -> Vec<u32> {
        self.step_results.iter().map(|r| r.step_number).collect()
    }

    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    fn main_path(&self) -> impl Iterator<Item = &StepResult> {
        self.step_results.iter().filter(|r| !r.recovery)
    }
}

#[derive(Clone)]
pub struct WorkflowExecutor {
    invoker: Arc<dyn ActionInvoker>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl WorkflowExecutor {
    pub fn new(invoker: Arc<dyn ActionInvoker>) -> Self {
        Self {
            invoker,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run `graph` to a terminal status and dispatch at most one notification
    pub async fn run(
        &self,
        kind: WorkflowKind,
        graph: &WorkflowGraph,
        policies: &RetryPolicyStore,
        context: &Value,
    ) -> WorkflowRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        log::info!("Starting {} run {} ({} steps)", kind, run_id, graph.len());

        let mut step_results = Vec::new();
        let mut last_main_succeeded = true;
        let mut recovered = false;
        let mut current = graph.entry_step();

        while let Some(n) = current {
            let Some(step) = graph.step(n) else {
                log::error!("{} run {}: step {} does not exist", kind, run_id, n);
                last_main_succeeded = false;
                break;
            };

            let result = self.run_step(kind, step, policies, context, false).await;
            let succeeded = result.succeeded();
            step_results.push(result);
            last_main_succeeded = succeeded;

            let route = if succeeded {
                step.on_success
            } else {
                step.on_failure
            };
            log::debug!("{} run {}: step {} routes to {}", kind, run_id, n, route);

            current = match route {
                StepRoute::NextStep => graph.next_main_step(n),
                StepRoute::EndWorkflow => None,
                StepRoute::JumpTo(target) if target > n => Some(target),
                StepRoute::JumpTo(target) => {
                    log::error!(
                        "{} run {}: step {} jumps backwards to {}, stopping",
                        kind,
                        run_id,
                        n,
                        target
                    );
                    last_main_succeeded = false;
                    None
                }
                StepRoute::RecoveryStep => {
                    recovered = true;
                    match graph.recovery_step.and_then(|r| graph.step(r)) {
                        Some(recovery) => {
                            log::warn!(
                                "{} run {}: step {} failed, running recovery step {}",
                                kind,
                                run_id,
                                n,
                                recovery.step_number
                            );
                            let result = self.run_step(kind, recovery, policies, context, true).await;
                            step_results.push(result);
                        }
                        None => log::error!(
                            "{} run {}: no recovery step designated",
                            kind,
                            run_id
                        ),
                    }
                    None
                }
            };
        }

        let status = if recovered || !last_main_succeeded {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };

        let mut run = WorkflowRun {
            run_id,
            kind,
            status,
            step_results,
            started_at,
            completed_at: Utc::now(),
            notified: None,
        };

        match run.status {
            RunStatus::Succeeded => log::info!("{} run {} succeeded", kind, run_id),
            RunStatus::Failed => log::warn!(
                "{} run {} failed after steps {:?}",
                kind,
                run_id,
                run.executed_steps()
            ),
        }

        run.notified = self.notify(graph, &run, context).await;
        run
    }

    /// Invoke one step under its retry policy
    async fn run_step(
        &self,
        kind: WorkflowKind,
        step: &WorkflowStep,
        policies: &RetryPolicyStore,
        context: &Value,
        recovery: bool,
    ) -> StepResult {
        let mut result = StepResult {
            step_number: step.step_number,
            action_ref: step.action_ref.clone(),
            outcome: AttemptOutcome::Failure,
            attempts: 0,
            output: None,
            error: None,
            recovery,
        };

        let Some(policy) = policies.get(&step.retry_policy_id).await else {
            log::error!(
                "Step {} references unknown retry policy '{}', not invoking '{}'",
                step.step_number,
                step.retry_policy_id,
                step.action_ref
            );
            result.error = Some(format!(
                "Unknown retry policy '{}'",
                step.retry_policy_id
            ));
            return result;
        };

        let step_context = step_context(context, kind, step.step_number);

        loop {
            result.attempts += 1;
            let attempt = result.attempts;
            log::info!(
                "Step {} attempt {}: invoking '{}'",
                step.step_number,
                attempt,
                step.action_ref
            );

            let invocation = self.invoker.invoke(&step.action_ref, &step_context);
            let (outcome, output, error) =
                match tokio::time::timeout(policy.timeout(), invocation).await {
                    Ok(Ok(output)) => (AttemptOutcome::Success, Some(output), None),
                    Ok(Err(e)) if e.is_timeout() => {
                        (AttemptOutcome::Timeout, None, Some(e.to_string()))
                    }
                    Ok(Err(e)) => (AttemptOutcome::Failure, None, Some(e.to_string())),
                    Err(_) => {
                        let e = ActionError::TimedOut {
                            action_ref: step.action_ref.clone(),
                            seconds: policy.timeout_seconds,
                        };
                        (AttemptOutcome::Timeout, None, Some(e.to_string()))
                    }
                };

            result.outcome = outcome;
            result.output = output;
            result.error = error;

            if outcome.is_success() {
                log::info!("Step {} succeeded on attempt {}", step.step_number, attempt);
                return result;
            }

            if !policy.should_retry(attempt, outcome) {
                log::warn!(
                    "Step {} failed after {} attempt(s): {}",
                    step.step_number,
                    attempt,
                    result.error.as_deref().unwrap_or("unknown error")
                );
                return result;
            }

            let delay = policy.next_delay(attempt);
            log::info!(
                "Step {} attempt {} {:?}, retrying in {}s",
                step.step_number,
                attempt,
                outcome,
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn notify(
        &self,
        graph: &WorkflowGraph,
        run: &WorkflowRun,
        context: &Value,
    ) -> Option<NotificationTrigger> {
        let config = graph.notification.as_ref()?;
        let trigger = match run.status {
            RunStatus::Succeeded if config.on_success => NotificationTrigger::OnSuccess,
            RunStatus::Succeeded => return None,
            RunStatus::Failed if failure_trigger_fires(config.trigger, graph, run) => {
                config.trigger
            }
            RunStatus::Failed => return None,
        };

        let Some(notifier) = &self.notifier else {
            log::warn!(
                "{} run {}: no notifier configured for '{}'",
                run.kind,
                run.run_id,
                config.destination
            );
            return None;
        };

        let payload = json!({
            "run_id": run.run_id,
            "workflow": run.kind,
            "status": run.status,
            "trigger": trigger,
            "steps": run.step_results,
            "context": context,
        });

        match notifier.notify(trigger, &config.destination, &payload).await {
            Ok(()) => {
                log::info!(
                    "{} run {}: notified '{}' ({})",
                    run.kind,
                    run.run_id,
                    config.destination,
                    trigger
                );
                Some(trigger)
            }
            Err(e) => {
                log::error!(
                    "{} run {}: notification to '{}' failed: {}",
                    run.kind,
                    run.run_id,
                    config.destination,
                    e
                );
                None
            }
        }
    }
}

/// Failure triggers look at main-path steps only
fn failure_trigger_fires(
    trigger: NotificationTrigger,
    graph: &WorkflowGraph,
    run: &WorkflowRun,
) -> bool {
    match trigger {
        NotificationTrigger::FinalStepFail => {
            run.main_path().last().is_some_and(|r| !r.succeeded())
        }
        NotificationTrigger::AnyFail => run.main_path().any(|r| !r.succeeded()),
        NotificationTrigger::AllFail => {
            let failed = run.main_path().filter(|r| !r.succeeded()).count();
            failed > 0 && failed == graph.main_path_len()
        }
        NotificationTrigger::OnSuccess | NotificationTrigger::WorkflowStep => false,
    }
}

fn step_context(context: &Value, kind: WorkflowKind, step_number: u32) -> Value {
    let mut ctx = match context {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("context".to_string(), other.clone());
            map
        }
    };
    ctx.insert("workflow".to_string(), json!(kind));
    ctx.insert("step_number".to_string(), json!(step_number));
    Value::Object(ctx)
}
