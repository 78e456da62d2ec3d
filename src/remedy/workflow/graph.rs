// SPDX-License-Identifier: MIT

//! Workflow step graph
//!
//! Steps are numbered 1..=n. Normal routing only moves forward, and never
//! enters the designated recovery step; that step runs only when a failure
//! route asks for `recovery_step`.

use serde::{Deserialize, Serialize};

use super::types::{NotificationConfig, StepRoute, WorkflowStep};
use crate::remedy::actions::ActionRegistry;
use crate::remedy::retry::RetryPolicyStore;
use crate::runtime::error::ConfigError;
use crate::runtime::notifier::NotificationTrigger;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
    /// Step number run by `recovery_step` failure routes
    #[serde(default)]
    pub recovery_step: Option<u32>,
    #[serde(default)]
    pub notification: Option<NotificationConfig>,
}

impl WorkflowGraph {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        Self {
            steps,
            recovery_step: None,
            notification: None,
        }
    }

    pub fn with_recovery_step(mut self, step_number: u32) -> Self {
        self.recovery_step = Some(step_number);
        self
    }

    pub fn with_notification(mut self, notification: NotificationConfig) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, step_number: u32) -> Option<&WorkflowStep> {
        let idx = (step_number as usize).checked_sub(1)?;
        self.steps.get(idx)
    }

    pub fn is_recovery(&self, step_number: u32) -> bool {
        self.recovery_step == Some(step_number)
    }

    /// First main-path step
    pub fn entry_step(&self) -> Option<u32> {
        self.next_main_step(0)
    }

    /// Main-path step following `step_number`, skipping the recovery step
    pub fn next_main_step(&self, step_number: u32) -> Option<u32> {
        ((step_number + 1)..=self.steps.len() as u32).find(|n| !self.is_recovery(*n))
    }

    /// Number of steps on the main path
    pub fn main_path_len(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| !self.is_recovery(s.step_number))
            .count()
    }

    /// Append a step and return its number
    pub fn add_step(&mut self, action_ref: &str, retry_policy_id: &str) -> u32 {
        let step_number = self.steps.len() as u32 + 1;
        self.steps
            .push(WorkflowStep::new(step_number, action_ref, retry_policy_id));
        step_number
    }

    /// Delete a step and renumber the ones after it.
    ///
    /// Jumps to later steps follow their target down by one. A jump to the
    /// removed step lands on the step that took its place, or ends the
    /// workflow when none did. Removing the recovery step turns
    /// `recovery_step` routes into `end_workflow`.
    pub fn remove_step(&mut self, step_number: u32) -> Result<WorkflowStep, ConfigError> {
        if self.step(step_number).is_none() {
            return Err(ConfigError::UnknownStep(step_number));
        }
        let removed = self.steps.remove(step_number as usize - 1);
        let new_len = self.steps.len() as u32;

        let recovery_removed = self.recovery_step == Some(step_number);
        self.recovery_step = match self.recovery_step {
            Some(r) if r == step_number => None,
            Some(r) if r > step_number => Some(r - 1),
            other => other,
        };

        let shift = |route: StepRoute| match route {
            StepRoute::JumpTo(t) => {
                let t = if t > step_number { t - 1 } else { t };
                if t > new_len {
                    StepRoute::EndWorkflow
                } else {
                    StepRoute::JumpTo(t)
                }
            }
            StepRoute::RecoveryStep if recovery_removed => StepRoute::EndWorkflow,
            other => other,
        };

        for step in self.steps.iter_mut() {
            if step.step_number > step_number {
                step.step_number -= 1;
            }
            step.on_success = shift(step.on_success);
            step.on_failure = shift(step.on_failure);
        }

        Ok(removed)
    }

    /// Check numbering and routing; independent of any external store
    pub fn validate_structure(&self) -> Result<(), ConfigError> {
        let len = self.steps.len() as u32;

        for (idx, step) in self.steps.iter().enumerate() {
            let expected = idx as u32 + 1;
            if step.step_number != expected {
                return Err(ConfigError::NonContiguousSteps {
                    expected,
                    found: step.step_number,
                });
            }
        }

        if let Some(r) = self.recovery_step {
            if r == 0 || r > len {
                return Err(ConfigError::InvalidRecoveryStep(r));
            }
        }

        for step in &self.steps {
            let n = step.step_number;
            if step.on_success == StepRoute::RecoveryStep {
                return Err(ConfigError::RecoveryOnSuccess(n));
            }
            for route in [step.on_success, step.on_failure] {
                match route {
                    StepRoute::JumpTo(t) if t <= n || t > len || self.is_recovery(t) => {
                        return Err(ConfigError::InvalidJumpTarget { step: n, target: t });
                    }
                    StepRoute::RecoveryStep if self.recovery_step.is_none() => {
                        return Err(ConfigError::MissingRecoveryStep(n));
                    }
                    _ => {}
                }
            }
        }

        if let Some(notification) = &self.notification {
            if !notification.trigger.is_failure_trigger() {
                return Err(ConfigError::InvalidNotificationTrigger(
                    notification.trigger.to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Full validation including retry policy and action references
    pub async fn validate(
        &self,
        policies: &RetryPolicyStore,
        actions: Option<&ActionRegistry>,
    ) -> Result<(), ConfigError> {
        self.validate_structure()?;

        for step in &self.steps {
            if !policies.contains(&step.retry_policy_id).await {
                return Err(ConfigError::UnknownRetryPolicy {
                    step: step.step_number,
                    policy_id: step.retry_policy_id.clone(),
                });
            }
            if let Some(actions) = actions {
                if !actions.contains(&step.action_ref).await {
                    return Err(ConfigError::UnknownAction {
                        step: step.step_number,
                        action_ref: step.action_ref.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remedy::retry::RetryPolicy;

    fn graph(n: u32) -> WorkflowGraph {
        WorkflowGraph::new(
            (1..=n)
                .map(|i| WorkflowStep::new(i, &format!("action_{}", i), "standard"))
                .collect(),
        )
    }

    #[test]
    fn test_next_main_step_skips_recovery() {
        let g = graph(4).with_recovery_step(3);
        assert_eq!(g.entry_step(), Some(1));
        assert_eq!(g.next_main_step(2), Some(4));
        assert_eq!(g.next_main_step(4), None);
        assert_eq!(g.main_path_len(), 3);
    }

    #[test]
    fn test_add_step_numbers_sequentially() {
        let mut g = WorkflowGraph::default();
        assert_eq!(g.add_step("a", "p"), 1);
        assert_eq!(g.add_step("b", "p"), 2);
        assert!(g.validate_structure().is_ok());
    }

    #[test]
    fn test_remove_step_renumbers_and_shifts_jumps() {
        let mut g = graph(4);
        g.steps[0].on_success = StepRoute::JumpTo(4);
        g.steps[1].on_failure = StepRoute::JumpTo(3);

        let removed = g.remove_step(3).unwrap();
        assert_eq!(removed.action_ref, "action_3");

        let numbers: Vec<u32> = g.steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(g.steps[2].action_ref, "action_4");
        assert_eq!(g.steps[0].on_success, StepRoute::JumpTo(3));
        // Target removed: lands on the step that replaced it
        assert_eq!(g.steps[1].on_failure, StepRoute::JumpTo(3));
        assert!(g.validate_structure().is_ok());
    }

    #[test]
    fn test_remove_last_step_ends_dangling_jump() {
        let mut g = graph(3);
        g.steps[0].on_success = StepRoute::JumpTo(3);
        g.remove_step(3).unwrap();
        assert_eq!(g.steps[0].on_success, StepRoute::EndWorkflow);
    }

    #[test]
    fn test_remove_recovery_step_clears_routes() {
        let mut g = graph(3).with_recovery_step(3);
        g.steps[0].on_failure = StepRoute::RecoveryStep;

        g.remove_step(3).unwrap();
        assert_eq!(g.recovery_step, None);
        assert_eq!(g.steps[0].on_failure, StepRoute::EndWorkflow);
        assert!(g.validate_structure().is_ok());
    }

    #[test]
    fn test_remove_unknown_step() {
        let mut g = graph(2);
        assert_eq!(g.remove_step(0), Err(ConfigError::UnknownStep(0)));
        assert_eq!(g.remove_step(3), Err(ConfigError::UnknownStep(3)));
    }

    #[test]
    fn test_validate_non_contiguous() {
        let mut g = graph(3);
        g.steps[2].step_number = 5;
        assert_eq!(
            g.validate_structure(),
            Err(ConfigError::NonContiguousSteps {
                expected: 3,
                found: 5
            })
        );
    }

    #[test]
    fn test_validate_jump_targets() {
        let mut g = graph(3);
        g.steps[1].on_success = StepRoute::JumpTo(1);
        assert_eq!(
            g.validate_structure(),
            Err(ConfigError::InvalidJumpTarget { step: 2, target: 1 })
        );

        g.steps[1].on_success = StepRoute::JumpTo(2);
        assert!(g.validate_structure().is_err());

        g.steps[1].on_success = StepRoute::JumpTo(9);
        assert!(g.validate_structure().is_err());

        g.steps[1].on_success = StepRoute::JumpTo(3);
        assert!(g.validate_structure().is_ok());

        // Normal routing never enters the recovery step
        let g = g.with_recovery_step(3);
        assert!(g.validate_structure().is_err());
    }

    #[test]
    fn test_validate_recovery_routes() {
        let mut g = graph(3);
        g.steps[0].on_failure = StepRoute::RecoveryStep;
        assert_eq!(
            g.validate_structure(),
            Err(ConfigError::MissingRecoveryStep(1))
        );

        let mut g = g.with_recovery_step(3);
        assert!(g.validate_structure().is_ok());

        g.steps[0].on_success = StepRoute::RecoveryStep;
        assert_eq!(g.validate_structure(), Err(ConfigError::RecoveryOnSuccess(1)));

        let g = graph(2).with_recovery_step(7);
        assert_eq!(g.validate_structure(), Err(ConfigError::InvalidRecoveryStep(7)));
    }

    #[test]
    fn test_validate_notification_trigger() {
        let g = graph(1).with_notification(NotificationConfig {
            destination: "ops".to_string(),
            trigger: NotificationTrigger::OnSuccess,
            on_success: true,
        });
        assert!(matches!(
            g.validate_structure(),
            Err(ConfigError::InvalidNotificationTrigger(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_unknown_policy() {
        let store = RetryPolicyStore::new();
        let g = graph(2);
        assert!(matches!(
            g.validate(&store, None).await,
            Err(ConfigError::UnknownRetryPolicy { step: 1, .. })
        ));

        store.insert(RetryPolicy::new("standard", 1, 5)).await.unwrap();
        assert!(g.validate(&store, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_unknown_action() {
        let store = RetryPolicyStore::new();
        store.insert(RetryPolicy::new("standard", 1, 5)).await.unwrap();
        let actions = ActionRegistry::new();

        let result = graph(1).validate(&store, Some(&actions)).await;
        assert!(matches!(result, Err(ConfigError::UnknownAction { step: 1, .. })));
    }
}
