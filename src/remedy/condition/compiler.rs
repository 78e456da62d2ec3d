//! Condition tree to RQL text
//!
//! Nested groups are parenthesized so `parse(compile(tree))` rebuilds the
//! same structure.

use super::ast::{Condition, ConditionNode};

/// Render a condition tree in canonical RQL form.
///
/// Trees that pass `ConditionNode::validate` always parse back.
pub fn compile(node: &ConditionNode) -> String {
    match node {
        ConditionNode::Condition(c) => compile_condition(c),
        ConditionNode::Group(g) => g
            .children
            .iter()
            .map(compile_nested)
            .collect::<Vec<_>>()
            .join(&format!(" {} ", g.operator.symbol())),
    }
}

fn compile_nested(node: &ConditionNode) -> String {
    match node {
        ConditionNode::Condition(c) => compile_condition(c),
        ConditionNode::Group(_) => format!("({})", compile(node)),
    }
}

fn compile_condition(condition: &Condition) -> String {
    format!(
        "{} {} \"{}\"",
        condition.field,
        condition.operator,
        escape(&condition.value)
    )
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Syntax guide shown next to the query editor
pub const RQL_SYNTAX_HELP: &str = r#"RQL Syntax Guide:

Basic Syntax:
  field operator "value"

Operators:
  equals (==)          : Exact match
  not_equals (!=)      : Not equal
  contains (~)         : String contains
  starts_with (^)      : String starts with
  ends_with ($)        : String ends with
  greater_than (>)     : Numeric comparison
  less_than (<)        : Numeric comparison
  in                   : In comma separated list
  not_in               : Not in comma separated list

Logical Operators:
  &&  : AND (both conditions must match)
  ||  : OR (either condition can match)
  ( ) : group conditions

Examples:
  severity equals "critical" && event_status equals "active"
  source_ip == "192.168.1.1" || source_ip == "10.0.0.1"
  event_name contains "database" && (count > 5 || severity in "high,critical")"#;
