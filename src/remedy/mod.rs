// SPDX-License-Identifier: MIT

//! Auto-remediation rule engine
//!
//! Conditions decide whether a rule fires for an event, workflows carry out
//! the remediation, and the engine ties both to the approval lifecycle and
//! silence windows.

pub mod actions;
pub mod condition;
pub mod config;
pub mod engine;
pub mod retry;
pub mod rule;
pub mod workflow;

pub use engine::{RuleEngine, RuleExecution, RuleTrigger, TriggerOutcome};
