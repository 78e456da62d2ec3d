//! RQL (Remediation Query Language) parser
//!
//! Parses queries like:
//! - `severity equals "critical"`
//! - `source_ip == "10.0.0.1" || source_ip == "10.0.0.2"`
//! - `severity == "critical" && (count > 10 || event_name ~ "database")`
//!
//! Parsing is resilient: every offending condition yields one error and is
//! skipped, and the remaining conditions are still parsed and validated.

use super::ast::{Condition, ConditionNode, Field, LogicOp, Operator, MAX_NESTING};
use crate::runtime::error::ConfigError;
use std::ops::Range;
use thiserror::Error;

/// A single problem found while parsing a query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RqlError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Invalid condition syntax: \"{0}\"")]
    InvalidSyntax(String),

    #[error("Unknown field: \"{0}\". Valid fields: {fields}", fields = Field::names())]
    UnknownField(String),

    #[error("Unknown operator: \"{0}\". Valid operators: {ops}", ops = Operator::names())]
    UnknownOperator(String),

    #[error("Empty value in condition: \"{0}\"")]
    EmptyValue(String),

    #[error("Expected a condition after '{0}'")]
    MissingCondition(String),

    #[error("Unbalanced parenthesis")]
    UnbalancedParenthesis,

    #[error("Parentheses nest deeper than {max} levels", max = MAX_NESTING)]
    NestingTooDeep,

    #[error("No valid conditions could be parsed")]
    NoConditions,
}

/// Outcome of parsing a query
#[derive(Debug, Clone, PartialEq)]
pub struct RqlParse {
    /// Tree built from every condition that parsed cleanly
    pub root: Option<ConditionNode>,
    /// One entry per offending token, in source order
    pub errors: Vec<RqlError>,
    /// Logical operators in the order they appear
    pub logic: Vec<LogicOp>,
}

impl RqlParse {
    pub fn valid(&self) -> bool {
        self.errors.is_empty() && self.root.is_some()
    }

    /// Every parsed leaf, left to right
    pub fn conditions(&self) -> Vec<&Condition> {
        self.root
            .as_ref()
            .map(|r| r.conditions())
            .unwrap_or_default()
    }

    /// The tree, or every collected message as a configuration error
    pub fn into_result(self) -> Result<ConditionNode, ConfigError> {
        match self.root {
            Some(root) if self.errors.is_empty() => Ok(root),
            _ => Err(ConfigError::InvalidQuery(
                self.errors.iter().map(|e| e.to_string()).collect(),
            )),
        }
    }
}

/// Parse an RQL query into a condition tree, collecting every error
pub fn parse(input: &str) -> RqlParse {
    if input.trim().is_empty() {
        return RqlParse {
            root: None,
            errors: vec![RqlError::EmptyQuery],
            logic: vec![],
        };
    }

    let mut parser = Parser {
        input,
        tokens: tokenize(input),
        pos: 0,
        depth: 0,
        errors: Vec::new(),
        logic: Vec::new(),
    };

    let mut root = parser.parse_sequence();

    // A top-level sequence only stops early at a stray ')'
    while let Some(Token::RParen) = parser.peek() {
        parser.errors.push(RqlError::UnbalancedParenthesis);
        parser.pos += 1;

        let op = parser.take_logic_op();
        if parser.peek().is_none() {
            if let Some(op) = op {
                parser
                    .errors
                    .push(RqlError::MissingCondition(op.symbol().to_string()));
            }
            break;
        }
        if let Some(more) = parser.parse_sequence() {
            root = Some(match root {
                Some(ConditionNode::Group(mut g)) => {
                    g.children.push(more);
                    ConditionNode::Group(g)
                }
                Some(node) => ConditionNode::group(op.unwrap_or_default(), vec![node, more]),
                None => more,
            });
        }
    }

    if root.is_none() && parser.errors.is_empty() {
        parser.errors.push(RqlError::NoConditions);
    }

    RqlParse {
        root,
        errors: parser.errors,
        logic: parser.logic,
    }
}

/// Parse and report, keeping the same shape as `parse`
pub fn validate_rql(input: &str) -> RqlParse {
    parse(input)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Symbol(&'static str),
    And,
    Or,
    LParen,
    RParen,
    Unterminated,
    Unexpected,
}

const SPECIAL: &[char] = &['(', ')', '"', '\'', '&', '|', '=', '!', '~', '^', '$', '<', '>'];

fn tokenize(input: &str) -> Vec<(Token, Range<usize>)> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let end_of = |i: usize| chars.get(i).map(|(p, _)| *p).unwrap_or(input.len());
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, len) = match (c, next) {
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('=', Some('=')) => (Token::Symbol("=="), 2),
            ('!', Some('=')) => (Token::Symbol("!="), 2),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('~', _) => (Token::Symbol("~"), 1),
            ('^', _) => (Token::Symbol("^"), 1),
            ('$', _) => (Token::Symbol("$"), 1),
            ('>', _) => (Token::Symbol(">"), 1),
            ('<', _) => (Token::Symbol("<"), 1),
            ('"', _) | ('\'', _) => {
                let mut value = String::new();
                let mut j = i + 1;
                let mut closed = false;
                while j < chars.len() {
                    match chars[j].1 {
                        '\\' if j + 1 < chars.len() => {
                            value.push(chars[j + 1].1);
                            j += 2;
                        }
                        q if q == c => {
                            closed = true;
                            j += 1;
                            break;
                        }
                        other => {
                            value.push(other);
                            j += 1;
                        }
                    }
                }
                let token = if closed {
                    Token::Quoted(value)
                } else {
                    Token::Unterminated
                };
                tokens.push((token, start..end_of(j)));
                i = j;
                continue;
            }
            (c, _) if SPECIAL.contains(&c) => (Token::Unexpected, 1),
            _ => {
                let mut j = i;
                while j < chars.len()
                    && !chars[j].1.is_whitespace()
                    && !SPECIAL.contains(&chars[j].1)
                {
                    j += 1;
                }
                let word = input[start..end_of(j)].to_string();
                tokens.push((Token::Word(word), start..end_of(j)));
                i = j;
                continue;
            }
        };

        tokens.push((token, start..end_of(i + len)));
        i += len;
    }

    tokens
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    depth: usize,
    errors: Vec<RqlError>,
    logic: Vec<LogicOp>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    /// Source text spanned by tokens `start..end`
    fn text(&self, start: usize, end: usize) -> String {
        match (self.tokens.get(start), end.checked_sub(1).and_then(|e| self.tokens.get(e))) {
            (Some((_, first)), Some((_, last))) if start < end => {
                self.input[first.start..last.end].to_string()
            }
            _ => String::new(),
        }
    }

    fn take_logic_op(&mut self) -> Option<LogicOp> {
        let op = match self.peek() {
            Some(Token::And) => LogicOp::And,
            Some(Token::Or) => LogicOp::Or,
            _ => return None,
        };
        self.pos += 1;
        self.logic.push(op);
        Some(op)
    }

    /// `term ((&& | ||) term)*` up to a `)` or the end of input.
    /// The first logic operator at this level names the group.
    fn parse_sequence(&mut self) -> Option<ConditionNode> {
        let mut children = Vec::new();
        let mut operator: Option<LogicOp> = None;

        match self.peek() {
            None => {}
            Some(Token::RParen) => {
                if self.depth > 0 {
                    self.errors.push(RqlError::InvalidSyntax("()".to_string()));
                }
            }
            Some(Token::And) | Some(Token::Or) => {
                let text = self.text(self.pos, self.pos + 1);
                self.errors.push(RqlError::InvalidSyntax(text));
            }
            Some(_) => {
                if let Some(node) = self.parse_term() {
                    children.push(node);
                }
            }
        }

        loop {
            match self.peek() {
                None | Some(Token::RParen) => break,
                Some(Token::And) | Some(Token::Or) => {}
                Some(_) => {
                    // Two terms with no operator between them
                    let start = self.pos;
                    self.skip_term();
                    let text = self.text(start, self.pos);
                    self.errors.push(RqlError::InvalidSyntax(text));
                    continue;
                }
            }

            let Some(op) = self.take_logic_op() else {
                break;
            };
            operator.get_or_insert(op);

            match self.peek() {
                None | Some(Token::And) | Some(Token::Or) | Some(Token::RParen) => {
                    self.errors
                        .push(RqlError::MissingCondition(op.symbol().to_string()));
                }
                _ => {
                    if let Some(node) = self.parse_term() {
                        children.push(node);
                    }
                }
            }
        }

        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(ConditionNode::group(operator.unwrap_or_default(), children)),
        }
    }

    fn parse_term(&mut self) -> Option<ConditionNode> {
        if let Some(Token::LParen) = self.peek() {
            if self.depth >= MAX_NESTING {
                self.errors.push(RqlError::NestingTooDeep);
                self.skip_group();
                return None;
            }
            self.pos += 1;
            self.depth += 1;
            let inner = self.parse_sequence();
            match self.peek() {
                Some(Token::RParen) => self.pos += 1,
                _ => self.errors.push(RqlError::UnbalancedParenthesis),
            }
            self.depth -= 1;
            return inner;
        }
        self.parse_condition()
    }

    /// Step over a parenthesized group, through its matching `)` or the end
    fn skip_group(&mut self) {
        let mut open = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LParen => open += 1,
                Token::RParen => open = open.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
            if open == 0 {
                return;
            }
        }
    }

    /// Step over one term without reporting anything inside it
    fn skip_term(&mut self) {
        if let Some(Token::LParen) = self.peek() {
            self.skip_group();
            return;
        }
        while matches!(
            self.peek(),
            Some(t) if !matches!(t, Token::And | Token::Or | Token::LParen | Token::RParen)
        ) {
            self.pos += 1;
        }
    }

    /// `field operator value`, consuming tokens up to the next separator
    fn parse_condition(&mut self) -> Option<ConditionNode> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(t) if !matches!(t, Token::And | Token::Or | Token::LParen | Token::RParen)
        ) {
            self.pos += 1;
        }
        let text = self.text(start, self.pos);
        let segment = &self.tokens[start..self.pos];

        let (field, op, value_tokens) = match segment {
            [(Token::Word(field), _), (op, _), rest @ ..] if !rest.is_empty() => {
                let op = match op {
                    Token::Symbol(s) => s.to_string(),
                    Token::Word(w) => w.clone(),
                    _ => {
                        self.errors.push(RqlError::InvalidSyntax(text));
                        return None;
                    }
                };
                (field.clone(), op, rest)
            }
            _ => {
                self.errors.push(RqlError::InvalidSyntax(text));
                return None;
            }
        };

        let value = match value_tokens {
            [(Token::Quoted(v), _)] => v.clone(),
            words if words.iter().all(|(t, _)| matches!(t, Token::Word(_))) => words
                .iter()
                .filter_map(|(t, _)| match t {
                    Token::Word(w) => Some(w.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
            _ => {
                self.errors.push(RqlError::InvalidSyntax(text));
                return None;
            }
        };

        let field = match field.parse::<Field>() {
            Ok(f) => f,
            Err(name) => {
                self.errors.push(RqlError::UnknownField(name));
                return None;
            }
        };

        let operator = match Operator::from_token(&op) {
            Some(o) => o,
            None => {
                self.errors.push(RqlError::UnknownOperator(op));
                return None;
            }
        };

        if value.trim().is_empty() {
            self.errors.push(RqlError::EmptyValue(text));
            return None;
        }

        Some(ConditionNode::Condition(Condition {
            field,
            operator,
            value,
        }))
    }
}
