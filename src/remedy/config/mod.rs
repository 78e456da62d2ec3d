//! Engine configuration: YAML schema, loader and builder

mod builder;
mod loader;
pub mod types;

pub use builder::Builder;
pub use loader::RemedyLoader;
pub use types::{
    ActionDefinition, ActionKind, ConditionConfig, DestinationConfig, DestinationKind,
    RemedyConfig, RuleConfig,
};
