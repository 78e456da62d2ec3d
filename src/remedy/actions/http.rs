// SPDX-License-Identifier: MIT

//! Outbound API call action

use crate::runtime::action::Action;
use crate::runtime::error::ActionError;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    fn as_method(&self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Whether the trigger context is sent as the JSON body
    fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

/// Outbound API definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpEndpoint {
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Calls an API endpoint; any 2xx response is success
pub struct HttpAction {
    id: String,
    description: String,
    endpoint: HttpEndpoint,
    client: Client,
}

impl HttpAction {
    pub fn new(id: &str, description: &str, endpoint: HttpEndpoint) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            endpoint,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Action for HttpAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, context: &Value) -> Result<Value, ActionError> {
        let method = self.endpoint.method;
        let mut request = self
            .client
            .request(method.as_method(), &self.endpoint.endpoint)
            .header("Accept", "application/json");
        for (name, value) in &self.endpoint.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if method.sends_body() {
            request = request.json(context);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ActionError::failed(&self.id, e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ActionError::failed(&self.id, e.to_string()))?;

        if !status.is_success() {
            log::warn!("Action '{}' got HTTP {}: {}", self.id, status, text);
            return Err(ActionError::failed(
                &self.id,
                format!("HTTP {}: {}", status.as_u16(), text),
            ));
        }

        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        Ok(json!({
            "status": status.as_u16(),
            "body": body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_deserialize() {
        let yaml = r#"
endpoint: https://api.internal.com/db/restart
method: PATCH
headers:
  Authorization: Bearer token
"#;
        let endpoint: HttpEndpoint = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(endpoint.method, HttpMethod::Patch);
        assert_eq!(endpoint.headers["Authorization"], "Bearer token");
    }

    #[test]
    fn test_method_defaults_to_post() {
        let endpoint: HttpEndpoint =
            serde_yaml::from_str("endpoint: https://example.com").unwrap();
        assert_eq!(endpoint.method, HttpMethod::Post);
        assert!(endpoint.method.sends_body());
        assert!(!HttpMethod::Get.sends_body());
        assert_eq!(HttpMethod::Delete.as_method(), Method::DELETE);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        let action = HttpAction::new(
            "restart_db",
            "Restart database",
            HttpEndpoint {
                endpoint: "http://127.0.0.1:1/restart".to_string(),
                method: HttpMethod::Post,
                headers: HashMap::new(),
            },
        );
        let err = action.execute(&json!({"rule_id": "r1"})).await.unwrap_err();
        assert!(matches!(err, ActionError::Failed { .. }));
    }
}
