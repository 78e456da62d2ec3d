// SPDX-License-Identifier: MIT

//! Rule trigger conditions
//!
//! A condition is a tree of `field operator "value"` leaves joined by
//! AND/OR groups. It is authored either through the tree editing
//! operations or as RQL text, for example:
//! - `severity == "critical" && event_status == "active"`
//! - `event_name ~ "db" && (count > 5 || severity in "high,critical")`

mod ast;
mod compiler;
mod evaluator;
mod event;
mod parser;

pub use ast::{Condition, ConditionGroup, ConditionNode, Field, LogicOp, Operator, MAX_NESTING};
pub use compiler::{compile, RQL_SYNTAX_HELP};
pub use evaluator::{evaluate, evaluate_condition};
pub use event::{Event, EventValue};
pub use parser::{parse, validate_rql, RqlError, RqlParse};
