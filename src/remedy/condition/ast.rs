// SPDX-License-Identifier: MIT

//! Condition tree types and the visual-builder editing operations

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::runtime::error::ConfigError;

/// Deepest group nesting accepted in RQL text and in condition trees
pub const MAX_NESTING: usize = 64;

/// Event fields a condition may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    EventName,
    EventStatus,
    Severity,
    SourceIp,
    GroupKey,
    EventSource,
    Timestamp,
    Duration,
    Count,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::EventName,
        Field::EventStatus,
        Field::Severity,
        Field::SourceIp,
        Field::GroupKey,
        Field::EventSource,
        Field::Timestamp,
        Field::Duration,
        Field::Count,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::EventName => "event_name",
            Field::EventStatus => "event_status",
            Field::Severity => "severity",
            Field::SourceIp => "source_ip",
            Field::GroupKey => "group_key",
            Field::EventSource => "event_source",
            Field::Timestamp => "timestamp",
            Field::Duration => "duration",
            Field::Count => "count",
        }
    }

    /// Comma separated list of every field name, for error messages
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|f| f.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    In,
    NotIn,
}

/// Canonical names plus the symbolic aliases accepted in RQL
static OPERATOR_TOKENS: Lazy<HashMap<&'static str, Operator>> = Lazy::new(|| {
    let mut tokens: HashMap<&'static str, Operator> =
        Operator::ALL.iter().map(|op| (op.as_str(), *op)).collect();
    tokens.insert("==", Operator::Equals);
    tokens.insert("!=", Operator::NotEquals);
    tokens.insert("~", Operator::Contains);
    tokens.insert("^", Operator::StartsWith);
    tokens.insert("$", Operator::EndsWith);
    tokens.insert(">", Operator::GreaterThan);
    tokens.insert("<", Operator::LessThan);
    tokens
});

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::In,
        Operator::NotIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::In => "in",
            Operator::NotIn => "not_in",
        }
    }

    /// Resolve a canonical name or symbolic alias
    pub fn from_token(token: &str) -> Option<Operator> {
        OPERATOR_TOKENS.get(token).copied()
    }

    /// Whether the operator compares numerically
    pub fn is_numeric(&self) -> bool {
        matches!(self, Operator::GreaterThan | Operator::LessThan)
    }

    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|op| op.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logical operator joining the children of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOp {
    #[default]
    And,
    Or,
}

impl LogicOp {
    /// RQL spelling
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicOp::And => "&&",
            LogicOp::Or => "||",
        }
    }
}

impl std::fmt::Display for LogicOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicOp::And => write!(f, "AND"),
            LogicOp::Or => write!(f, "OR"),
        }
    }
}

/// Leaf comparison: `field operator "value"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: Field,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(field: Field, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }
}

/// Ordered children joined by one logical operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub operator: LogicOp,
    pub children: Vec<ConditionNode>,
}

/// A node of the condition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConditionNode {
    Condition(Condition),
    Group(ConditionGroup),
}

enum Removal {
    Kept,
    Emptied,
}

impl ConditionNode {
    pub fn leaf(field: Field, operator: Operator, value: impl Into<String>) -> Self {
        ConditionNode::Condition(Condition::new(field, operator, value))
    }

    pub fn group(operator: LogicOp, children: Vec<ConditionNode>) -> Self {
        ConditionNode::Group(ConditionGroup { operator, children })
    }

    /// Node at a child-index path (empty path is the node itself)
    pub fn get(&self, path: &[usize]) -> Option<&ConditionNode> {
        let mut current = self;
        for &idx in path {
            match current {
                ConditionNode::Group(g) => current = g.children.get(idx)?,
                ConditionNode::Condition(_) => return None,
            }
        }
        Some(current)
    }

    fn group_at_mut(&mut self, path: &[usize]) -> Option<&mut ConditionGroup> {
        let mut current = self;
        for &idx in path {
            match current {
                ConditionNode::Group(g) => current = g.children.get_mut(idx)?,
                ConditionNode::Condition(_) => return None,
            }
        }
        match current {
            ConditionNode::Group(g) => Some(g),
            ConditionNode::Condition(_) => None,
        }
    }

    /// Append a child to the group addressed by `path`
    pub fn add_child(&mut self, path: &[usize], child: ConditionNode) -> Result<(), ConfigError> {
        let group = self
            .group_at_mut(path)
            .ok_or_else(|| ConfigError::InvalidPath(path.to_vec()))?;
        group.children.push(child);
        Ok(())
    }

    /// Append a leaf to the group addressed by `path`
    pub fn add_condition(&mut self, path: &[usize], condition: Condition) -> Result<(), ConfigError> {
        self.add_child(path, ConditionNode::Condition(condition))
    }

    /// Append an empty sub-group; the caller fills it before validating
    pub fn add_group(&mut self, path: &[usize], operator: LogicOp) -> Result<(), ConfigError> {
        self.add_child(path, ConditionNode::group(operator, Vec::new()))
    }

    /// Change the logical operator of the group addressed by `path`
    pub fn set_operator(&mut self, path: &[usize], operator: LogicOp) -> Result<(), ConfigError> {
        let group = self
            .group_at_mut(path)
            .ok_or_else(|| ConfigError::InvalidPath(path.to_vec()))?;
        group.operator = operator;
        Ok(())
    }

    /// Delete the node addressed by `path`.
    ///
    /// A group left with one child collapses into that child; a group left
    /// with none is deleted from its parent in turn. Emptying the root is
    /// refused and leaves the tree untouched.
    pub fn remove(&mut self, path: &[usize]) -> Result<(), ConfigError> {
        if path.is_empty() {
            return Err(ConfigError::InvalidPath(vec![]));
        }
        let mut updated = self.clone();
        match remove_at(&mut updated, path, path)? {
            Removal::Emptied => Err(ConfigError::EmptyGroup),
            Removal::Kept => {
                *self = updated;
                Ok(())
            }
        }
    }

    /// Every leaf, left to right
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        collect_conditions(self, &mut out);
        out
    }

    /// Check builder invariants: no empty groups, no empty values, nesting
    /// within `MAX_NESTING`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut pending = vec![(self, 0usize)];
        while let Some((node, depth)) = pending.pop() {
            match node {
                ConditionNode::Condition(c) => {
                    if c.value.trim().is_empty() {
                        return Err(ConfigError::EmptyValue(c.field.to_string()));
                    }
                }
                ConditionNode::Group(g) => {
                    if depth > MAX_NESTING {
                        return Err(ConfigError::NestingTooDeep(MAX_NESTING));
                    }
                    if g.children.is_empty() {
                        return Err(ConfigError::EmptyGroup);
                    }
                    pending.extend(g.children.iter().rev().map(|c| (c, depth + 1)));
                }
            }
        }
        Ok(())
    }
}

fn remove_at(
    node: &mut ConditionNode,
    path: &[usize],
    full_path: &[usize],
) -> Result<Removal, ConfigError> {
    let group = match &mut *node {
        ConditionNode::Group(g) => g,
        ConditionNode::Condition(_) => return Err(ConfigError::InvalidPath(full_path.to_vec())),
    };
    let idx = path[0];
    if idx >= group.children.len() {
        return Err(ConfigError::InvalidPath(full_path.to_vec()));
    }

    if path.len() == 1 {
        group.children.remove(idx);
    } else if let Removal::Emptied = remove_at(&mut group.children[idx], &path[1..], full_path)? {
        group.children.remove(idx);
    }

    match group.children.len() {
        0 => Ok(Removal::Emptied),
        1 => {
            if let Some(only) = group.children.pop() {
                *node = only;
            }
            Ok(Removal::Kept)
        }
        _ => Ok(Removal::Kept),
    }
}

fn collect_conditions<'a>(node: &'a ConditionNode, out: &mut Vec<&'a Condition>) {
    match node {
        ConditionNode::Condition(c) => out.push(c),
        ConditionNode::Group(g) => g.children.iter().for_each(|c| collect_conditions(c, out)),
    }
}
