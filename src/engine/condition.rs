// ABOUTME: Guard condition parsing and evaluation for step execution
// ABOUTME: A guard is a three-token comparison compiled once when a document is loaded

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use super::context::ExecutionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "===")]
    StrictEqual,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "!==")]
    StrictNotEqual,
}

impl Operator {
    pub fn parse(token: &str) -> Option<Self> {
        let operator = match token {
            ">" => Operator::Greater,
            "<" => Operator::Less,
            ">=" => Operator::GreaterOrEqual,
            "<=" => Operator::LessOrEqual,
            "==" => Operator::Equal,
            "===" => Operator::StrictEqual,
            "!=" => Operator::NotEqual,
            "!==" => Operator::StrictNotEqual,
            _ => return None,
        };
        Some(operator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
            Operator::Equal => "==",
            Operator::StrictEqual => "===",
            Operator::NotEqual => "!=",
            Operator::StrictNotEqual => "!==",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    /// Numeric when the token parses to a finite number, text otherwise.
    pub fn parse(token: &str) -> Self {
        match token.parse::<f64>() {
            Ok(number) if number.is_finite() => Literal::Number(number),
            _ => Literal::Text(token.to_string()),
        }
    }

    fn as_number(&self) -> f64 {
        match self {
            Literal::Number(number) => *number,
            Literal::Text(text) => text_to_number(text),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(number) => write!(f, "{}", number),
            Literal::Text(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: String,
    pub operator: Operator,
    pub right: Literal,
}

impl Comparison {
    pub fn evaluate(&self, context: &ExecutionContext) -> bool {
        let left = context.get(&self.left);

        match self.operator {
            Operator::Equal => loose_equal(left, &self.right),
            Operator::NotEqual => !loose_equal(left, &self.right),
            Operator::StrictEqual => strict_equal(left, &self.right),
            Operator::StrictNotEqual => !strict_equal(left, &self.right),
            Operator::Greater => matches!(compare(left, &self.right), Some(Ordering::Greater)),
            Operator::Less => matches!(compare(left, &self.right), Some(Ordering::Less)),
            Operator::GreaterOrEqual => matches!(
                compare(left, &self.right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::LessOrEqual => matches!(
                compare(left, &self.right),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// What a malformed guard evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionMode {
    /// Malformed guards evaluate to `true`; the step runs as if unguarded.
    #[default]
    FailOpen,
    /// Malformed guards evaluate to `false`; the step is skipped.
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison(Comparison),
    Malformed { expression: String, reason: String },
}

impl Condition {
    pub fn parse(expression: &str) -> Self {
        let tokens: Vec<&str> = expression.split_whitespace().collect();

        let [left, operator, right] = tokens.as_slice() else {
            return Condition::Malformed {
                expression: expression.to_string(),
                reason: format!("expected 3 tokens, found {}", tokens.len()),
            };
        };

        match Operator::parse(operator) {
            Some(operator) => Condition::Comparison(Comparison {
                left: left.to_string(),
                operator,
                right: Literal::parse(right),
            }),
            None => Condition::Malformed {
                expression: expression.to_string(),
                reason: format!("unrecognized operator '{}'", operator),
            },
        }
    }

    pub fn evaluate(&self, context: &ExecutionContext, mode: ConditionMode) -> bool {
        match self {
            Condition::Comparison(comparison) => comparison.evaluate(context),
            Condition::Malformed { .. } => mode == ConditionMode::FailOpen,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Condition::Malformed { .. })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Comparison(comparison) => write!(
                f,
                "{} {} {}",
                comparison.left, comparison.operator, comparison.right
            ),
            Condition::Malformed { expression, .. } => write!(f, "{}", expression),
        }
    }
}

/// Parse and evaluate in one go, failing open on malformed input.
pub fn evaluate_condition(expression: &str, context: &ExecutionContext) -> bool {
    Condition::parse(expression).evaluate(context, ConditionMode::FailOpen)
}

fn strict_equal(left: Option<&Value>, right: &Literal) -> bool {
    match (left, right) {
        (Some(Value::Number(number)), Literal::Number(expected)) => {
            number.as_f64() == Some(*expected)
        }
        (Some(Value::String(text)), Literal::Text(expected)) => text == expected,
        _ => false,
    }
}

fn loose_equal(left: Option<&Value>, right: &Literal) -> bool {
    match (left, right) {
        (None | Some(Value::Null), _) => false,
        (Some(Value::String(text)), Literal::Text(expected)) => text == expected,
        (Some(value), literal) => value_to_number(value) == literal.as_number(),
    }
}

fn compare(left: Option<&Value>, right: &Literal) -> Option<Ordering> {
    match (left, right) {
        (None, _) => None,
        (Some(Value::String(text)), Literal::Text(expected)) => Some(text.as_str().cmp(expected)),
        (Some(value), literal) => value_to_number(value).partial_cmp(&literal.as_number()),
    }
}

fn value_to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => text_to_number(text),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

fn text_to_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() => number,
        _ => f64::NAN,
    }
}
