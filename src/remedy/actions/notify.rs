// SPDX-License-Identifier: MIT

//! Notification dispatchers

use crate::runtime::action::Action;
use crate::runtime::error::{ActionError, NotifyError};
use crate::runtime::notifier::{NotificationTrigger, Notifier};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Writes notifications to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        trigger: NotificationTrigger,
        destination: &str,
        payload: &Value,
    ) -> Result<(), NotifyError> {
        match trigger {
            NotificationTrigger::OnSuccess | NotificationTrigger::WorkflowStep => {
                log::info!("[{}] {}: {}", destination, trigger, payload)
            }
            _ => log::warn!("[{}] {}: {}", destination, trigger, payload),
        }
        Ok(())
    }
}

/// Posts notifications as JSON to a webhook URL
pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        trigger: NotificationTrigger,
        destination: &str,
        payload: &Value,
    ) -> Result<(), NotifyError> {
        let delivery = |message: String| NotifyError::Delivery {
            destination: destination.to_string(),
            message,
        };

        let body = json!({
            "trigger": trigger,
            "destination": destination,
            "payload": payload,
        });
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| delivery(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(delivery(format!("HTTP {}", resp.status().as_u16())));
        }
        Ok(())
    }
}

/// Workflow step that sends its context to a notification destination
pub struct NotifyAction {
    id: String,
    description: String,
    destination: String,
    notifier: Arc<dyn Notifier>,
}

impl NotifyAction {
    pub fn new(
        id: &str,
        description: &str,
        destination: &str,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            destination: destination.to_string(),
            notifier,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

#[async_trait]
impl Action for NotifyAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, context: &Value) -> Result<Value, ActionError> {
        self.notifier
            .notify(NotificationTrigger::WorkflowStep, &self.destination, context)
            .await
            .map_err(|e| ActionError::failed(&self.id, e.to_string()))?;
        Ok(json!({ "destination": self.destination }))
    }
}

/// Dispatches each named destination to its own notifier
#[derive(Clone, Default)]
pub struct NotificationRouter {
    routes: HashMap<String, Arc<dyn Notifier>>,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, destination: &str, notifier: Arc<dyn Notifier>) -> Self {
        self.routes.insert(destination.to_string(), notifier);
        self
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.routes.contains_key(destination)
    }
}

#[async_trait]
impl Notifier for NotificationRouter {
    async fn notify(
        &self,
        trigger: NotificationTrigger,
        destination: &str,
        payload: &Value,
    ) -> Result<(), NotifyError> {
        let notifier = self
            .routes
            .get(destination)
            .ok_or_else(|| NotifyError::UnknownDestination(destination.to_string()))?;
        notifier.notify(trigger, destination, payload).await
    }
}
