use crate::runtime::error::NotifyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a notification was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTrigger {
    /// The workflow run succeeded
    OnSuccess,
    /// The last attempted step failed
    FinalStepFail,
    /// At least one step failed
    AnyFail,
    /// Every step failed
    AllFail,
    /// Sent by a notify step inside a workflow
    WorkflowStep,
}

impl NotificationTrigger {
    /// Triggers a workflow's notification config may use for failed runs
    pub fn is_failure_trigger(&self) -> bool {
        matches!(
            self,
            NotificationTrigger::FinalStepFail
                | NotificationTrigger::AnyFail
                | NotificationTrigger::AllFail
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTrigger::OnSuccess => "on_success",
            NotificationTrigger::FinalStepFail => "final_step_fail",
            NotificationTrigger::AnyFail => "any_fail",
            NotificationTrigger::AllFail => "all_fail",
            NotificationTrigger::WorkflowStep => "workflow_step",
        }
    }
}

impl std::fmt::Display for NotificationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dispatches run notifications to a named destination
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        trigger: NotificationTrigger,
        destination: &str,
        payload: &Value,
    ) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_as_str() {
        assert_eq!(NotificationTrigger::OnSuccess.as_str(), "on_success");
        assert_eq!(NotificationTrigger::FinalStepFail.as_str(), "final_step_fail");
        assert_eq!(NotificationTrigger::AnyFail.as_str(), "any_fail");
        assert_eq!(NotificationTrigger::AllFail.to_string(), "all_fail");
        assert_eq!(NotificationTrigger::WorkflowStep.as_str(), "workflow_step");
    }

    #[test]
    fn test_failure_triggers() {
        assert!(NotificationTrigger::AnyFail.is_failure_trigger());
        assert!(!NotificationTrigger::OnSuccess.is_failure_trigger());
        assert!(!NotificationTrigger::WorkflowStep.is_failure_trigger());
    }

    #[test]
    fn test_trigger_deserialize() {
        let trigger: NotificationTrigger = serde_yaml::from_str("any_fail").unwrap();
        assert_eq!(trigger, NotificationTrigger::AnyFail);
    }
}
