// SPDX-License-Identifier: MIT

//! Local script action

use crate::runtime::action::Action;
use crate::runtime::error::ActionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::process::Command;

/// Environment variable carrying the trigger context as JSON
pub const CONTEXT_ENV: &str = "REMEDY_CONTEXT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Runs a local command; exit status 0 is success.
///
/// The child is killed if the attempt is dropped, so a retry policy timeout
/// does not leave it running.
pub struct ScriptAction {
    id: String,
    description: String,
    script: ScriptCommand,
}

impl ScriptAction {
    pub fn new(id: &str, description: &str, script: ScriptCommand) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            script,
        }
    }
}

#[async_trait]
impl Action for ScriptAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, context: &Value) -> Result<Value, ActionError> {
        let mut command = Command::new(&self.script.command);
        command
            .args(&self.script.args)
            .env(CONTEXT_ENV, context.to_string())
            .kill_on_drop(true);
        if let Some(dir) = &self.script.working_dir {
            command.current_dir(dir);
        }

        log::debug!("Action '{}': running {}", self.id, self.script.command);
        let output = command
            .output()
            .await
            .map_err(|e| ActionError::failed(&self.id, e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(ActionError::failed(
                &self.id,
                format!("exit status {}: {}", code, stderr),
            ));
        }

        Ok(json!({
            "exit_code": output.status.code(),
            "stdout": stdout,
            "stderr": stderr,
        }))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ScriptAction {
        ScriptAction::new(
            "script",
            "test script",
            ScriptCommand {
                command: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
                working_dir: None,
            },
        )
    }

    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let output = sh("echo cleaned").execute(&json!({})).await.unwrap();
        assert_eq!(output["exit_code"], 0);
        assert_eq!(output["stdout"], "cleaned");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let err = sh("echo broken >&2; exit 3")
            .execute(&json!({}))
            .await
            .unwrap_err();
        match err {
            ActionError::Failed { message, .. } => {
                assert!(message.contains("exit status 3"));
                assert!(message.contains("broken"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_context_passed_in_env() {
        let output = sh("printf '%s' \"$REMEDY_CONTEXT\"")
            .execute(&json!({"rule_id": "r1"}))
            .await
            .unwrap();
        let stdout = output["stdout"].as_str().unwrap();
        let context: Value = serde_json::from_str(stdout).unwrap();
        assert_eq!(context["rule_id"], "r1");
    }

    #[tokio::test]
    async fn test_missing_command_fails() {
        let action = ScriptAction::new(
            "missing",
            "",
            ScriptCommand {
                command: "/nonexistent/remedy-script".to_string(),
                args: vec![],
                working_dir: None,
            },
        );
        assert!(action.execute(&json!({})).await.is_err());
    }
}
