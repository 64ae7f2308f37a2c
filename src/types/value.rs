use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::expr::CompareOp;

/// Scalar values flowing through rule evaluation.
///
/// Every number is a [`Decimal`]; there is no separate integer or float kind,
/// so no rule can drift from another through mixed representations.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent or explicitly empty.
    #[default]
    Null,
    /// A boolean value.
    Bool(bool),
    /// An exact decimal number.
    Number(Decimal),
    /// A UTF-8 string.
    String(String),
}

impl Value {
    /// Coerce to a number the way arithmetic sees it.
    ///
    /// `Null` and `""` are zero, booleans are one or zero, and strings must
    /// parse as decimals. Returns `None` for non-numeric strings.
    #[must_use]
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Null => Some(Decimal::ZERO),
            Value::Bool(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
            Value::Number(n) => Some(*n),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(Decimal::ZERO)
                } else {
                    parse_decimal(trimmed)
                }
            }
        }
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !n.is_zero(),
            Value::String(s) => !s.is_empty(),
        }
    }

    /// Compare this value to another using the given operator.
    ///
    /// Returns `None` when the pair cannot be ordered (for example a
    /// non-numeric string against a number); callers treat that as `false`.
    #[must_use]
    pub fn compare(&self, op: CompareOp, other: &Value) -> Option<bool> {
        match op {
            CompareOp::Eq => Some(self.loose_eq(other)),
            CompareOp::Neq => Some(!self.loose_eq(other)),
            CompareOp::StrictEq => Some(self == other),
            CompareOp::StrictNeq => Some(self != other),
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
                let ord = self.order(other)?;
                Some(match op {
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Gte => ord != Ordering::Less,
                    CompareOp::Lt => ord == Ordering::Less,
                    _ => ord != Ordering::Greater,
                })
            }
        }
    }

    fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::String(a), Value::String(b)) => a == b,
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    fn order(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) => Some(a.as_number()?.cmp(&b.as_number()?)),
        }
    }

    /// Convert a JSON scalar into a value. Arrays and objects have no scalar
    /// form and become `None`.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => decimal_from_json(n).map(Value::Number),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

pub(crate) fn decimal_from_json(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    parse_decimal(&n.to_string())
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(Decimal::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(Decimal::from(v))
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Number(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
        }
    }
}
