//! Condition tree evaluator
//!
//! Evaluation is total: a missing field or an unparsable number is a
//! non-match, never an error.

use super::ast::{Condition, ConditionNode, LogicOp, Operator};
use super::event::{Event, EventValue};

/// Evaluate a condition tree against an event
pub fn evaluate(node: &ConditionNode, event: &Event) -> bool {
    match node {
        ConditionNode::Condition(c) => evaluate_condition(c, event),
        // An empty group cannot be built through the editor; fail closed.
        ConditionNode::Group(g) if g.children.is_empty() => false,
        ConditionNode::Group(g) => match g.operator {
            LogicOp::And => g.children.iter().all(|c| evaluate(c, event)),
            LogicOp::Or => g.children.iter().any(|c| evaluate(c, event)),
        },
    }
}

/// Evaluate a single leaf
pub fn evaluate_condition(condition: &Condition, event: &Event) -> bool {
    let actual = match event.get(condition.field.as_str()) {
        Some(v) => v,
        None => {
            return matches!(condition.operator, Operator::NotEquals | Operator::NotIn);
        }
    };
    let expected = condition.value.as_str();

    match condition.operator {
        Operator::Equals => actual.as_text() == expected,
        Operator::NotEquals => actual.as_text() != expected,
        Operator::Contains => actual.as_text().contains(expected),
        Operator::StartsWith => actual.as_text().starts_with(expected),
        Operator::EndsWith => actual.as_text().ends_with(expected),
        Operator::GreaterThan => compare_numbers(actual, expected, |a, b| a > b),
        Operator::LessThan => compare_numbers(actual, expected, |a, b| a < b),
        Operator::In => in_list(actual, expected),
        Operator::NotIn => !in_list(actual, expected),
    }
}

fn compare_numbers<F>(actual: &EventValue, expected: &str, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (actual.as_number(), expected.trim().parse::<f64>()) {
        (Some(a), Ok(b)) => cmp(a, b),
        _ => false,
    }
}

/// `in` lists are comma separated; items are trimmed
fn in_list(actual: &EventValue, list: &str) -> bool {
    let actual = actual.as_text();
    list.split(',').any(|item| item.trim() == actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remedy::condition::ast::Field;

    fn leaf(field: Field, op: Operator, value: &str) -> ConditionNode {
        ConditionNode::leaf(field, op, value)
    }

    fn event() -> Event {
        Event::new()
            .with("severity", "critical")
            .with("event_name", "database connection lost")
            .with("count", 12i64)
            .with("duration", "7.5")
            .with("source_ip", "10.0.0.4")
    }

    #[test]
    fn test_string_operators() {
        let e = event();
        assert!(evaluate(&leaf(Field::Severity, Operator::Equals, "critical"), &e));
        assert!(!evaluate(&leaf(Field::Severity, Operator::Equals, "Critical"), &e));
        assert!(evaluate(&leaf(Field::Severity, Operator::NotEquals, "low"), &e));
        assert!(evaluate(&leaf(Field::EventName, Operator::Contains, "connection"), &e));
        assert!(evaluate(&leaf(Field::EventName, Operator::StartsWith, "database"), &e));
        assert!(evaluate(&leaf(Field::EventName, Operator::EndsWith, "lost"), &e));
        assert!(!evaluate(&leaf(Field::EventName, Operator::EndsWith, "found"), &e));
    }

    #[test]
    fn test_numeric_operators() {
        let e = event();
        assert!(evaluate(&leaf(Field::Count, Operator::GreaterThan, "10"), &e));
        assert!(!evaluate(&leaf(Field::Count, Operator::GreaterThan, "12"), &e));
        assert!(evaluate(&leaf(Field::Duration, Operator::LessThan, "8"), &e));
        assert!(evaluate(&leaf(Field::Count, Operator::Equals, "12"), &e));
    }

    #[test]
    fn test_numeric_parse_failure_fails_closed() {
        let e = event();
        assert!(!evaluate(&leaf(Field::Severity, Operator::GreaterThan, "1"), &e));
        assert!(!evaluate(&leaf(Field::Severity, Operator::LessThan, "1"), &e));
        assert!(!evaluate(&leaf(Field::Count, Operator::GreaterThan, "many"), &e));
    }

    #[test]
    fn test_missing_field() {
        let e = Event::new();
        assert!(!evaluate(&leaf(Field::GroupKey, Operator::Equals, "x"), &e));
        assert!(!evaluate(&leaf(Field::GroupKey, Operator::Contains, "x"), &e));
        assert!(!evaluate(&leaf(Field::GroupKey, Operator::GreaterThan, "1"), &e));
        assert!(!evaluate(&leaf(Field::GroupKey, Operator::In, "x,y"), &e));
        assert!(evaluate(&leaf(Field::GroupKey, Operator::NotEquals, "x"), &e));
        assert!(evaluate(&leaf(Field::GroupKey, Operator::NotIn, "x,y"), &e));
    }

    #[test]
    fn test_in_list() {
        let e = event();
        assert!(evaluate(&leaf(Field::Severity, Operator::In, "high, critical"), &e));
        assert!(!evaluate(&leaf(Field::Severity, Operator::In, "low,medium"), &e));
        assert!(evaluate(&leaf(Field::Severity, Operator::NotIn, "low,medium"), &e));
        assert!(!evaluate(&leaf(Field::Severity, Operator::NotIn, "critical"), &e));
    }

    #[test]
    fn test_groups_match_boolean_connectives() {
        let e = event();
        let t = leaf(Field::Severity, Operator::Equals, "critical");
        let f = leaf(Field::Severity, Operator::Equals, "low");

        for (a, b) in [(&t, &t), (&t, &f), (&f, &t), (&f, &f)] {
            let and = ConditionNode::group(LogicOp::And, vec![a.clone(), b.clone()]);
            let or = ConditionNode::group(LogicOp::Or, vec![a.clone(), b.clone()]);
            assert_eq!(evaluate(&and, &e), evaluate(a, &e) && evaluate(b, &e));
            assert_eq!(evaluate(&or, &e), evaluate(a, &e) || evaluate(b, &e));
        }
    }

    #[test]
    fn test_nested_groups() {
        let e = event();
        let tree = ConditionNode::group(
            LogicOp::And,
            vec![
                leaf(Field::Severity, Operator::Equals, "critical"),
                ConditionNode::group(
                    LogicOp::Or,
                    vec![
                        leaf(Field::SourceIp, Operator::StartsWith, "192.168."),
                        leaf(Field::Count, Operator::GreaterThan, "5"),
                    ],
                ),
            ],
        );
        assert!(evaluate(&tree, &e));
    }

    #[test]
    fn test_empty_group_fails_closed() {
        let e = event();
        assert!(!evaluate(&ConditionNode::group(LogicOp::And, vec![]), &e));
        assert!(!evaluate(&ConditionNode::group(LogicOp::Or, vec![]), &e));
    }
}
