//! Calculator Tool
//!
//! Evaluates either two operands or an arithmetic expression made of
//! digits, decimal points, parentheses and `+ - * /`. Every failure is
//! reported as `Error calculating <expr>: <reason>` tool output.

use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::Result;
use crate::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};

const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalcError {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("empty expression")]
    Empty,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected '{0}'")]
    Unexpected(char),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unbalanced parentheses")]
    Unbalanced,

    #[error("expression nested too deeply")]
    TooDeep,

    #[error("missing operator")]
    MissingOperator,

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("'{name}' must be a number, got {value}")]
    NotANumber { name: String, value: String },

    #[error("provide either 'expression' or both 'a' and 'b'")]
    MissingOperands,

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Num(Decimal),
    Op(char),
    Open,
    Close,
}

fn tokenize(expr: &str) -> std::result::Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Num(parse_literal(&literal)?));
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            other => return Err(CalcError::InvalidCharacter(other)),
        }
    }

    Ok(tokens)
}

fn parse_literal(literal: &str) -> std::result::Result<Decimal, CalcError> {
    if literal == "." || literal.matches('.').count() > 1 {
        return Err(CalcError::InvalidNumber(literal.to_string()));
    }
    let mut normalized = literal.to_string();
    if normalized.starts_with('.') {
        normalized.insert(0, '0');
    }
    if normalized.ends_with('.') {
        normalized.push('0');
    }
    Decimal::from_str(&normalized).map_err(|_| CalcError::InvalidNumber(literal.to_string()))
}

/// Recursive-descent evaluator: `expr := term (('+'|'-') term)*`,
/// `term := factor (('*'|'/') factor)*`, `factor := ('+'|'-') factor | num | '(' expr ')'`.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> std::result::Result<Decimal, CalcError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = apply(op, value, rhs)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<Decimal, CalcError> {
        let mut value = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = apply(op, value, rhs)?;
        }
        Ok(value)
    }

    fn factor(&mut self) -> std::result::Result<Decimal, CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }

        let value = match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::Op('-')) => Ok(-self.factor()?),
            Some(Token::Op('+')) => self.factor(),
            Some(Token::Op(op)) => Err(CalcError::Unexpected(op)),
            Some(Token::Open) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(CalcError::Unbalanced),
                }
            }
            Some(Token::Close) => Err(CalcError::Unexpected(')')),
            None => Err(CalcError::UnexpectedEnd),
        };

        self.depth -= 1;
        value
    }
}

fn apply(op: char, lhs: Decimal, rhs: Decimal) -> std::result::Result<Decimal, CalcError> {
    match op {
        '+' => lhs.checked_add(rhs).ok_or(CalcError::Overflow),
        '-' => lhs.checked_sub(rhs).ok_or(CalcError::Overflow),
        '*' => lhs.checked_mul(rhs).ok_or(CalcError::Overflow),
        '/' => {
            if rhs.is_zero() {
                return Err(CalcError::DivisionByZero);
            }
            lhs.checked_div(rhs).ok_or(CalcError::Overflow)
        }
        other => Err(CalcError::Unexpected(other)),
    }
}

/// Evaluate an arithmetic expression with standard precedence and left associativity
pub fn evaluate_expression(expr: &str) -> std::result::Result<Decimal, CalcError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    match parser.peek() {
        None => Ok(value.normalize()),
        Some(Token::Close) => Err(CalcError::Unbalanced),
        Some(Token::Op(op)) => Err(CalcError::Unexpected(op)),
        Some(Token::Num(_) | Token::Open) => Err(CalcError::MissingOperator),
    }
}

#[derive(Clone, Copy, Debug)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    fn parse(s: &str) -> std::result::Result<Self, CalcError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" | "+" | "sum" => Ok(Self::Add),
            "subtract" | "-" | "difference" => Ok(Self::Subtract),
            "multiply" | "*" | "product" => Ok(Self::Multiply),
            "divide" | "/" | "quotient" => Ok(Self::Divide),
            other => Err(CalcError::UnknownOperation(other.to_string())),
        }
    }

    const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }

    const fn noun(self) -> &'static str {
        match self {
            Self::Add => "sum",
            Self::Subtract => "difference",
            Self::Multiply => "product",
            Self::Divide => "quotient",
        }
    }
}

fn operand(call: &ToolCall, name: &str) -> std::result::Result<Decimal, CalcError> {
    let not_a_number = |value: &serde_json::Value| CalcError::NotANumber {
        name: name.to_string(),
        value: value.to_string(),
    };

    let value = call.arguments.get(name).ok_or(CalcError::MissingOperands)?;
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => return Err(not_a_number(other)),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(|d| d.normalize())
        .map_err(|_| not_a_number(value))
}

/// Arithmetic on two operands or a restricted expression
pub struct CalculatorTool;

impl CalculatorTool {
    pub const NAME: &'static str = "calculator";

    fn run_expression(expr: &str) -> ToolResult {
        let expr = expr.trim();
        match evaluate_expression(expr) {
            Ok(value) => ToolResult::success(Self::NAME, format!("The result of {expr} is {value}")),
            Err(e) => ToolResult::failure(Self::NAME, format!("Error calculating {expr}: {e}")),
        }
    }

    fn run_operands(call: &ToolCall) -> ToolResult {
        let op = match call.arguments.get("operation") {
            None | Some(serde_json::Value::Null) => Ok(Operation::Add),
            Some(serde_json::Value::String(s)) => Operation::parse(s),
            Some(other) => Err(CalcError::UnknownOperation(other.to_string())),
        };
        let label = op.as_ref().map_or('?', |op| op.symbol());

        let outcome = op.and_then(|op| {
            let a = operand(call, "a")?;
            let b = operand(call, "b")?;
            let value = apply(op.symbol(), a, b)?.normalize();
            Ok(format!("The {} of {a} and {b} is {value}", op.noun()))
        });

        match outcome {
            Ok(output) => ToolResult::success(Self::NAME, output),
            Err(e) => ToolResult::failure(Self::NAME, format!("Error calculating a {label} b: {e}")),
        }
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Useful for performing basic arithmetic calculations with numbers. \
                Pass either an 'expression' such as '(2 + 3) * 4', or two numbers 'a' and 'b' \
                with an optional 'operation'."
                .into(),
            parameters: vec![
                ParameterSchema::new(
                    "expression",
                    "string",
                    "Arithmetic expression using digits, '.', parentheses and + - * /",
                ),
                ParameterSchema::new("a", "number", "First operand"),
                ParameterSchema::new("b", "number", "Second operand"),
                ParameterSchema::new("operation", "string", "Operation on a and b (default: add)")
                    .one_of(vec![
                        serde_json::json!("add"),
                        serde_json::json!("subtract"),
                        serde_json::json!("multiply"),
                        serde_json::json!("divide"),
                    ]),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        tracing::info!(tool = Self::NAME, "tool called");

        let result = match call.arguments.get("expression") {
            Some(serde_json::Value::String(expr)) => Self::run_expression(expr),
            Some(serde_json::Value::Number(n)) => Self::run_expression(&n.to_string()),
            Some(other) if !other.is_null() => ToolResult::failure(
                Self::NAME,
                format!("Error calculating {other}: expression must be a string"),
            ),
            _ if call.arguments.contains_key("a") || call.arguments.contains_key("b") => {
                Self::run_operands(call)
            }
            _ => ToolResult::failure(
                Self::NAME,
                format!("Error calculating: {}", CalcError::MissingOperands),
            ),
        };

        Ok(result)
    }
}
