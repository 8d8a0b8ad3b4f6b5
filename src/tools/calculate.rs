// ABOUTME: Arithmetic tool evaluating + - * / expressions with parentheses
// ABOUTME: Integral results are returned as JSON integers so they render without a fraction

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Number, Value};

use super::{parse_params, Result, Tool, ToolError, ToolParams};

pub struct CalculateTool;

#[derive(Debug, Deserialize)]
struct CalculateParams {
    expression: Value,
}

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate the arithmetic `expression` (+, -, *, /, parentheses)"
    }

    async fn invoke(&self, params: ToolParams) -> Result<Value> {
        let params: CalculateParams = parse_params(self.name(), params)?;
        let expression = match params.expression {
            Value::String(text) => text,
            Value::Number(number) => return Ok(Value::Number(number)),
            other => {
                return Err(ToolError::InvalidParams {
                    tool_id: self.name().to_string(),
                    message: format!("expression must be a string, got {}", other),
                })
            }
        };

        let result = evaluate(&expression).map_err(ToolError::Failed)?;
        Ok(to_json_number(result))
    }
}

fn to_json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> std::result::Result<f64, String> {
    if expression.trim().is_empty() {
        return Err("empty expression".to_string());
    }

    let mut parser = Parser {
        chars: expression.chars().collect(),
        position: 0,
    };

    let value = parser.expression()?;
    if let Some(c) = parser.peek() {
        return Err(format!("unexpected '{}' at position {}", c, parser.position));
    }
    if !value.is_finite() {
        return Err(format!("result is not a finite number: {}", expression));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    position: usize,
}

impl Parser {
    /// Next non-whitespace character, without consuming it.
    fn peek(&mut self) -> Option<char> {
        while self.chars.get(self.position).is_some_and(|c| c.is_whitespace()) {
            self.position += 1;
        }
        self.chars.get(self.position).copied()
    }

    fn expression(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.position += 1;
            let rhs = self.term()?;
            if op == '+' {
                value += rhs;
            } else {
                value -= rhs;
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.position += 1;
            let rhs = self.factor()?;
            if op == '*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err("division by zero".to_string());
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> std::result::Result<f64, String> {
        match self.peek() {
            Some('-') => {
                self.position += 1;
                Ok(-self.factor()?)
            }
            Some('+') => {
                self.position += 1;
                self.factor()
            }
            Some('(') => {
                self.position += 1;
                let value = self.expression()?;
                if self.peek() != Some(')') {
                    return Err("missing closing parenthesis".to_string());
                }
                self.position += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(format!("unexpected '{}' at position {}", c, self.position)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> std::result::Result<f64, String> {
        let start = self.position;
        while self
            .chars
            .get(self.position)
            .is_some_and(|c| c.is_ascii_digit() || *c == '.')
        {
            self.position += 1;
        }
        let literal: String = self.chars[start..self.position].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{}'", literal))
    }
}
