//! Rules, their approval lifecycle and silence windows

mod lifecycle;
pub mod model;
mod repository;
mod silence;

pub use lifecycle::{AllowListAuthorizer, Authorizer};
pub use model::{
    ApprovalEvent, ApprovalEventKind, ApprovalInfo, ApprovalStatus, Priority, Rule,
    RuleDefinition, SilenceUnit, SilenceWindow,
};
pub use repository::{InMemoryRuleRepository, RuleRepository};
pub use silence::{SilenceController, SilenceDecision};
