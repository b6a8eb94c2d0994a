//! Host query language seam.
//!
//! Parsing and evaluation internals belong to the query engine; the navigation
//! core only needs to turn a declared value expression into a string.

use std::any::Any;
use std::fmt;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    /// Text values of the matched nodes, in document order.
    NodeSet(Vec<String>),
    Empty,
}

impl fmt::Display for Value {
    /// Stringifies the way the query language coerces values to strings:
    /// integral numbers drop the fraction, node-sets yield their first node.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Number(n) if n.is_nan() => f.write_str("NaN"),
            Value::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Value::NodeSet(nodes) => f.write_str(nodes.first().map(String::as_str).unwrap_or("")),
            Value::Empty => Ok(()),
        }
    }
}

/// A parsed expression. Concrete engines downcast through `as_any`.
pub trait Expression: fmt::Debug {
    /// The original text, used in error reporting.
    fn source(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

/// Parses expression text. A syntax error means the app definition is broken.
pub trait ExpressionParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Box<dyn Expression>, String>;
}

/// Evaluates expressions against the current session and app state.
pub trait EvaluationContext {
    fn evaluate(&self, expression: &dyn Expression) -> Result<Value, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_stringification() {
        assert_eq!(Value::String("abc".into()).to_string(), "abc");
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-2.5).to_string(), "-2.5");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(
            Value::NodeSet(vec!["first".into(), "second".into()]).to_string(),
            "first"
        );
        assert_eq!(Value::NodeSet(Vec::new()).to_string(), "");
        assert_eq!(Value::Empty.to_string(), "");
    }
}
