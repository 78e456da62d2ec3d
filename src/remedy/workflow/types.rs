// SPDX-License-Identifier: MIT

//! Step and routing types for remediation and verification workflows

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::runtime::notifier::NotificationTrigger;

/// Where a step hands control after it finishes.
///
/// Serialized as `next_step`, `end_workflow`, `jump:<n>` or `recovery_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StepRoute {
    NextStep,
    EndWorkflow,
    JumpTo(u32),
    /// Failure-only: run the designated recovery step, then fail
    RecoveryStep,
}

impl FromStr for StepRoute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "next_step" => Ok(StepRoute::NextStep),
            "end_workflow" => Ok(StepRoute::EndWorkflow),
            "recovery_step" => Ok(StepRoute::RecoveryStep),
            other => other
                .strip_prefix("jump:")
                .and_then(|n| n.trim().parse::<u32>().ok())
                .map(StepRoute::JumpTo)
                .ok_or_else(|| format!("Unknown step route '{}'", other)),
        }
    }
}

impl TryFrom<String> for StepRoute {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StepRoute> for String {
    fn from(route: StepRoute) -> Self {
        route.to_string()
    }
}

impl std::fmt::Display for StepRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepRoute::NextStep => write!(f, "next_step"),
            StepRoute::EndWorkflow => write!(f, "end_workflow"),
            StepRoute::JumpTo(n) => write!(f, "jump:{}", n),
            StepRoute::RecoveryStep => write!(f, "recovery_step"),
        }
    }
}

fn default_on_success() -> StepRoute {
    StepRoute::NextStep
}

fn default_on_failure() -> StepRoute {
    StepRoute::EndWorkflow
}

/// One step of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// 1-based, contiguous within the graph
    pub step_number: u32,
    /// Action reference resolved by the action invoker
    pub action_ref: String,
    /// Retry policy id resolved against the policy store at run time
    pub retry_policy_id: String,
    #[serde(default = "default_on_success")]
    pub on_success: StepRoute,
    #[serde(default = "default_on_failure")]
    pub on_failure: StepRoute,
}

impl WorkflowStep {
    pub fn new(step_number: u32, action_ref: &str, retry_policy_id: &str) -> Self {
        Self {
            step_number,
            action_ref: action_ref.to_string(),
            retry_policy_id: retry_policy_id.to_string(),
            on_success: StepRoute::NextStep,
            on_failure: StepRoute::EndWorkflow,
        }
    }

    pub fn on_success(mut self, route: StepRoute) -> Self {
        self.on_success = route;
        self
    }

    pub fn on_failure(mut self, route: StepRoute) -> Self {
        self.on_failure = route;
        self
    }
}

fn default_failure_trigger() -> NotificationTrigger {
    NotificationTrigger::FinalStepFail
}

/// Per-workflow notification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Named destination (channel, webhook) known to the notifier
    pub destination: String,
    /// Failure trigger evaluated when the run fails
    #[serde(default = "default_failure_trigger")]
    pub trigger: NotificationTrigger,
    /// Notify when the run succeeds
    #[serde(default)]
    pub on_success: bool,
}

/// Which of a rule's workflows a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Remediation,
    Verification,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowKind::Remediation => write!(f, "remediation"),
            WorkflowKind::Verification => write!(f, "verification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_from_str() {
        assert_eq!("next_step".parse(), Ok(StepRoute::NextStep));
        assert_eq!("end_workflow".parse(), Ok(StepRoute::EndWorkflow));
        assert_eq!("recovery_step".parse(), Ok(StepRoute::RecoveryStep));
        assert_eq!("jump:4".parse(), Ok(StepRoute::JumpTo(4)));
        assert!("jump:".parse::<StepRoute>().is_err());
        assert!("jump:x".parse::<StepRoute>().is_err());
        assert!("retry".parse::<StepRoute>().is_err());
    }

    #[test]
    fn test_step_deserialize_defaults() {
        let yaml = r#"
step_number: 1
action_ref: restart_service
retry_policy_id: standard
"#;
        let step: WorkflowStep = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(step.on_success, StepRoute::NextStep);
        assert_eq!(step.on_failure, StepRoute::EndWorkflow);
    }

    #[test]
    fn test_step_routes_as_strings() {
        let step = WorkflowStep::new(1, "a", "p")
            .on_success(StepRoute::JumpTo(3))
            .on_failure(StepRoute::RecoveryStep);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["on_success"], "jump:3");
        assert_eq!(json["on_failure"], "recovery_step");

        let back: WorkflowStep = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_unknown_route_rejected() {
        let yaml = r#"
step_number: 1
action_ref: a
retry_policy_id: p
on_failure: retry_forever
"#;
        assert!(serde_yaml::from_str::<WorkflowStep>(yaml).is_err());
    }

    #[test]
    fn test_notification_defaults() {
        let config: NotificationConfig = serde_yaml::from_str("destination: ops").unwrap();
        assert_eq!(config.trigger, NotificationTrigger::FinalStepFail);
        assert!(!config.on_success);
    }
}
