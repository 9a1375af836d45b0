use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar attribute value: a number or a piece of text.
///
/// Values are deliberately loose. Text that looks like a number compares
/// numerically, and every value has a truthiness, because content authors
/// write formulas and prerequisites without type annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A numeric value. Booleans are stored as 1 and 0.
    Number(f64),
    /// A textual value, e.g. a race or concept name.
    Text(String),
}

impl Value {
    /// Numeric view of the value. Text is parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Whether the value counts as "true": non-zero numbers, non-empty text.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
        }
    }

    /// Returns the text if this is a textual value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_parses() {
        assert_eq!(Value::from(" 8 ").as_number(), Some(8.0));
        assert_eq!(Value::from("Elf").as_number(), None);
    }

    #[test]
    fn truthiness() {
        assert!(Value::from(2).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::from("").is_truthy());
    }

    #[test]
    fn display_drops_integral_fraction() {
        assert_eq!(Value::from(8).to_string(), "8");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(-3).to_string(), "-3");
    }

    #[test]
    fn json_is_untagged() {
        let v: Value = serde_json::from_str("4").unwrap();
        assert_eq!(v, Value::Number(4.0));
        let v: Value = serde_json::from_str("\"Human\"").unwrap();
        assert_eq!(v, Value::from("Human"));
    }
}
