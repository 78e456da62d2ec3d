//! Action invokers and notification dispatchers

mod http;
mod monitor;
mod notify;
mod registry;
mod script;

pub use http::{HttpAction, HttpEndpoint, HttpMethod};
pub use monitor::MonitorAction;
pub use notify::{LogNotifier, NotificationRouter, NotifyAction, WebhookNotifier};
pub use registry::ActionRegistry;
pub use script::{ScriptAction, ScriptCommand, CONTEXT_ENV};
