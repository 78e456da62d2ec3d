// SPDX-License-Identifier: MIT

//! Remediation and verification workflows
//!
//! A workflow is an ordered step graph with success/failure routing. Each
//! step names an action and a retry policy, both resolved by id.

pub mod executor;
mod graph;
pub mod types;

pub use executor::{RunStatus, StepResult, WorkflowExecutor, WorkflowRun};
pub use graph::WorkflowGraph;
pub use types::{NotificationConfig, StepRoute, WorkflowKind, WorkflowStep};
