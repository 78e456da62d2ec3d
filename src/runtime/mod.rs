// SPDX-License-Identifier: MIT

//! Execution kit shared by every remediation workflow
//!
//! Provides the error hierarchy and the seams to the outside world:
//! actions that remediation steps run and notifiers that report outcomes.

pub mod action;
pub mod error;
pub mod notifier;
