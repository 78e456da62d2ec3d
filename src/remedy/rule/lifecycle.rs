// SPDX-License-Identifier: MIT

//! Approval lifecycle
//!
//! `draft -> pending_approval -> approved | rejected`, with
//! `rejected -> pending_approval` on resubmit. Editing an approved rule sends
//! it back to `pending_approval`.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::model::{ApprovalEvent, ApprovalEventKind, ApprovalStatus, Rule, RuleDefinition};
use crate::runtime::error::{ConfigError, LifecycleError};

/// Yes/no capability check for approval decisions
pub trait Authorizer: Send + Sync {
    fn can_approve(&self, actor: &str) -> bool;
}

/// Grants the approval capability to a fixed set of actor ids
#[derive(Debug, Clone, Default)]
pub struct AllowListAuthorizer {
    admins: HashSet<String>,
}

impl AllowListAuthorizer {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }
}

impl Authorizer for AllowListAuthorizer {
    fn can_approve(&self, actor: &str) -> bool {
        self.admins.contains(actor)
    }
}

impl Rule {
    fn record(
        &mut self,
        kind: ApprovalEventKind,
        actor: &str,
        at: DateTime<Utc>,
        previous: ApprovalStatus,
        reason: Option<String>,
    ) {
        self.history.push(ApprovalEvent {
            kind,
            actor: actor.to_string(),
            at,
            previous_status: Some(previous),
            reason,
        });
    }

    /// `draft -> pending_approval`
    pub fn submit(&mut self, actor: &str, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        let previous = self.approval.status;
        if previous != ApprovalStatus::Draft {
            return Err(LifecycleError::invalid(previous, "submit"));
        }
        self.approval.status = ApprovalStatus::PendingApproval;
        self.approval.submitted_at = Some(now);
        self.record(ApprovalEventKind::SubmittedForApproval, actor, now, previous, None);
        Ok(())
    }

    /// `pending_approval -> approved`; approving an approved rule is a no-op
    pub fn approve(&mut self, actor: &str, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        let previous = self.approval.status;
        match previous {
            ApprovalStatus::Approved => Ok(()),
            ApprovalStatus::PendingApproval => {
                self.approval.status = ApprovalStatus::Approved;
                self.approval.approved_by = Some(actor.to_string());
                self.approval.approved_at = Some(now);
                self.record(ApprovalEventKind::Approved, actor, now, previous, None);
                Ok(())
            }
            _ => Err(LifecycleError::invalid(previous, "approve")),
        }
    }

    /// `pending_approval -> rejected`; the reason is mandatory.
    ///
    /// Rejecting a rejected rule is a no-op that keeps the original reason.
    pub fn reject(
        &mut self,
        actor: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LifecycleError::MissingReason);
        }
        let previous = self.approval.status;
        match previous {
            ApprovalStatus::Rejected => Ok(()),
            ApprovalStatus::PendingApproval => {
                self.approval.status = ApprovalStatus::Rejected;
                self.approval.rejected_by = Some(actor.to_string());
                self.approval.rejected_at = Some(now);
                self.approval.rejection_reason = Some(reason.to_string());
                self.record(
                    ApprovalEventKind::Rejected,
                    actor,
                    now,
                    previous,
                    Some(reason.to_string()),
                );
                Ok(())
            }
            _ => Err(LifecycleError::invalid(previous, "reject")),
        }
    }

    /// `rejected -> pending_approval`
    pub fn resubmit(&mut self, actor: &str, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        let previous = self.approval.status;
        if previous != ApprovalStatus::Rejected {
            return Err(LifecycleError::invalid(previous, "resubmit"));
        }
        self.approval.status = ApprovalStatus::PendingApproval;
        self.approval.submitted_at = Some(now);
        self.approval.rejected_by = None;
        self.approval.rejected_at = None;
        self.approval.rejection_reason = None;
        self.record(ApprovalEventKind::Resubmitted, actor, now, previous, None);
        Ok(())
    }

    /// Replace the definition after validating its structure.
    ///
    /// An approved rule goes back to `pending_approval` and loses its
    /// approval; other statuses are kept.
    pub fn edit(
        &mut self,
        actor: &str,
        definition: RuleDefinition,
        now: DateTime<Utc>,
    ) -> Result<(), ConfigError> {
        definition.validate_structure()?;
        self.definition = definition;

        let previous = self.approval.status;
        if previous == ApprovalStatus::Approved {
            self.approval.status = ApprovalStatus::PendingApproval;
            self.approval.submitted_at = Some(now);
            self.approval.approved_by = None;
            self.approval.approved_at = None;
            self.record(
                ApprovalEventKind::SubmittedForApproval,
                actor,
                now,
                previous,
                Some("approved rule edited".to_string()),
            );
        }
        Ok(())
    }
}
