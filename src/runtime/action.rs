use crate::runtime::error::ActionError;
use async_trait::async_trait;
use serde_json::Value;

/// A remediation action that can be run by a workflow step.
///
/// Implementations store their identifier in a struct field so `id()` does
/// not allocate.
#[async_trait]
pub trait Action: Send + Sync {
    /// Returns the action reference (must be unique within a registry)
    fn id(&self) -> &str;

    /// Returns a human-readable description of what the action does
    fn description(&self) -> &str;

    /// Run the action once with the triggering context
    async fn execute(&self, context: &Value) -> Result<Value, ActionError>;
}

/// Black-box invoker keyed by an opaque action reference.
///
/// The workflow executor only observes success, failure and (through its own
/// timeout) timeout.
#[async_trait]
pub trait ActionInvoker: Send + Sync {
    async fn invoke(&self, action_ref: &str, context: &Value) -> Result<Value, ActionError>;
}
