// SPDX-License-Identifier: MIT

//! Typed error handling for remedy-rs
//!
//! Configuration and lifecycle problems are surfaced synchronously to the
//! authoring flow. Evaluation-time non-matches are not errors at all, and
//! execution failures are reported through workflow run records.

use thiserror::Error;

/// Top-level error type for remedy-rs
#[derive(Debug, Error)]
pub enum RemedyError {
    /// Invalid rule, step graph or retry policy configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Approval workflow violations
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Action invocation errors
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    /// Notification dispatch errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors raised while authoring or loading rules
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// RQL text did not compile; carries every collected message
    #[error("Invalid RQL query: {}", .0.join("; "))]
    InvalidQuery(Vec<String>),

    /// A leaf condition has an empty value
    #[error("Empty value for condition on field '{0}'")]
    EmptyValue(String),

    /// A condition group without children
    #[error("Condition group must contain at least one child")]
    EmptyGroup,

    /// Condition groups nested past the supported depth
    #[error("Condition groups nest deeper than {0} levels")]
    NestingTooDeep(usize),

    /// Path does not address a node in the condition tree
    #[error("Invalid condition path: {0:?}")]
    InvalidPath(Vec<usize>),

    /// Step numbers must run 1..=n without gaps
    #[error("Step numbers must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguousSteps { expected: u32, found: u32 },

    /// Workflow has no steps
    #[error("The {0} workflow must contain at least one step")]
    EmptyWorkflow(String),

    /// Step number not present in the graph
    #[error("Step {0} does not exist")]
    UnknownStep(u32),

    /// Jump targets must point strictly forward to an existing step
    #[error("Step {step} jumps to step {target}, which is not a later step of the workflow")]
    InvalidJumpTarget { step: u32, target: u32 },

    /// `recovery_step` is only valid as a failure route
    #[error("Step {0} uses recovery_step as its success route")]
    RecoveryOnSuccess(u32),

    /// A failure route asks for recovery but the graph designates none
    #[error("Step {0} routes to recovery_step but no recovery step is designated")]
    MissingRecoveryStep(u32),

    /// The designated recovery step does not exist
    #[error("Recovery step {0} does not exist")]
    InvalidRecoveryStep(u32),

    /// Step references a retry policy absent from the store
    #[error("Step {step} references unknown retry policy '{policy_id}'")]
    UnknownRetryPolicy { step: u32, policy_id: String },

    /// Step references an action absent from the registry
    #[error("Step {step} references unknown action '{action_ref}'")]
    UnknownAction { step: u32, action_ref: String },

    /// Retry policy values out of range
    #[error("Invalid retry policy '{id}': {reason}")]
    InvalidRetryPolicy { id: String, reason: String },

    /// Silence window must be a positive duration when enabled
    #[error("Silence duration must be greater than zero")]
    InvalidSilenceDuration,

    /// Notification destination not configured
    #[error("Unknown notification destination '{0}'")]
    UnknownDestination(String),

    /// Failure notifications need a failure trigger
    #[error("Notification trigger '{0}' is not a failure trigger")]
    InvalidNotificationTrigger(String),

    /// Two rules share the same id
    #[error("Duplicate rule id '{0}'")]
    DuplicateRule(String),
}

/// Approval workflow errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LifecycleError {
    /// Reject requires a non-empty reason
    #[error("Rejection reason is required")]
    MissingReason,

    /// Transition not permitted from the current status
    #[error("Cannot {action} a rule in status '{from}'")]
    InvalidTransition { from: String, action: String },

    /// Only approved rules may execute
    #[error("Rule '{rule_id}' is not executable in status '{status}'")]
    NotExecutable { rule_id: String, status: String },

    /// Actor lacks the approval capability
    #[error("Actor '{0}' is not allowed to approve or reject rules")]
    Unauthorized(String),

    /// Rule id not present in the repository
    #[error("Rule '{0}' not found")]
    RuleNotFound(String),
}

/// Errors returned by action invokers
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    /// No action registered under this reference
    #[error("Action '{0}' not found")]
    NotFound(String),

    /// The action ran and reported failure
    #[error("Action '{action_ref}' failed: {message}")]
    Failed { action_ref: String, message: String },

    /// The attempt exceeded its retry policy timeout
    #[error("Action '{action_ref}' timed out after {seconds}s")]
    TimedOut { action_ref: String, seconds: u64 },
}

/// Errors returned by notifiers
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Destination not known to the notifier
    #[error("Unknown destination '{0}'")]
    UnknownDestination(String),

    /// Delivery failed
    #[error("Delivery to '{destination}' failed: {message}")]
    Delivery {
        destination: String,
        message: String,
    },
}

impl ActionError {
    /// Create a failure error
    pub fn failed(action_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            action_ref: action_ref.into(),
            message: message.into(),
        }
    }

    /// Whether this error was a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

impl LifecycleError {
    /// Create an invalid transition error
    pub fn invalid(from: impl ToString, action: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            action: action.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_query_joins_messages() {
        let err = ConfigError::InvalidQuery(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Invalid RQL query: a; b");
    }

    #[test]
    fn test_config_error_converts_to_top_level() {
        let err: RemedyError = ConfigError::EmptyGroup.into();
        assert!(matches!(err, RemedyError::Config(ConfigError::EmptyGroup)));
    }

    #[test]
    fn test_action_error_timeout() {
        let err = ActionError::TimedOut {
            action_ref: "restart".to_string(),
            seconds: 30,
        };
        assert!(err.is_timeout());
        assert!(!ActionError::failed("restart", "boom").is_timeout());
    }
}
