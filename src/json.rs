//! JSON encoding of pricing expressions.
//!
//! Expressions travel inside the registration configuration in the
//! JsonLogic style: an operator object with exactly one key whose value is the
//! argument list (or a single argument). Scalars are literals.
//!
//! ```json
//! {"if": [{"<": [{"var": "camper.age"}, 12]},
//!         {"var": "pricing.child"},
//!         {"var": "pricing.adult"}]}
//! ```

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value as Json, json};
use thiserror::Error;

use crate::types::{AGGREGATE_ROOT, ArithOp, CompareOp, Expr, Value};

/// Structural problems found while decoding a JSON expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("unknown operator '{op}'")]
    UnknownOperator { op: String },

    #[error("operator '{op}' expects {expected} argument(s), found {found}")]
    Arity {
        op: String,
        expected: &'static str,
        found: usize,
    },

    #[error("operator object must have exactly one key, found {found}")]
    OperatorKeys { found: usize },

    #[error("'var' needs a non-empty path")]
    InvalidPath,

    #[error("'{op}' argument must be a literal scalar")]
    NonScalar { op: String },

    #[error("array is only allowed as the second argument of 'in'")]
    UnexpectedArray,

    #[error("number {value} cannot be represented exactly")]
    InvalidNumber { value: String },
}

/// Decode a JSON expression.
///
/// # Errors
///
/// Returns [`ExprError`] if the JSON does not describe a valid expression.
pub fn decode(json: &Json) -> Result<Expr, ExprError> {
    match json {
        Json::Array(_) => Err(ExprError::UnexpectedArray),
        Json::Object(map) => decode_operator(map),
        scalar => Value::from_json(scalar)
            .map(Expr::Literal)
            .ok_or_else(|| ExprError::InvalidNumber {
                value: scalar.to_string(),
            }),
    }
}

fn decode_operator(map: &Map<String, Json>) -> Result<Expr, ExprError> {
    let mut entries = map.iter();
    let (op, raw_args) = match (entries.next(), map.len()) {
        (Some(entry), 1) => entry,
        (_, found) => return Err(ExprError::OperatorKeys { found }),
    };
    let args: &[Json] = match raw_args {
        Json::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    let op = op.as_str();

    match op {
        "var" => decode_var(args),
        "sum" => {
            arity(op, args, "1", |n| n == 1)?;
            match &args[0] {
                Json::String(rule) if !rule.is_empty() => Ok(Expr::Var {
                    path: format!("{AGGREGATE_ROOT}.{rule}"),
                    default: None,
                }),
                _ => Err(ExprError::InvalidPath),
            }
        }
        "+" => arith(ArithOp::Add, op, args, "at least 1", |n| n >= 1),
        "*" => arith(ArithOp::Mul, op, args, "at least 1", |n| n >= 1),
        "-" => arith(ArithOp::Sub, op, args, "1 or 2", |n| n == 1 || n == 2),
        "/" => arith(ArithOp::Div, op, args, "2", |n| n == 2),
        "%" => arith(ArithOp::Mod, op, args, "2", |n| n == 2),
        "min" => arith(ArithOp::Min, op, args, "at least 1", |n| n >= 1),
        "max" => arith(ArithOp::Max, op, args, "at least 1", |n| n >= 1),
        "==" => compare(CompareOp::Eq, op, args),
        "!=" => compare(CompareOp::Neq, op, args),
        "===" => compare(CompareOp::StrictEq, op, args),
        "!==" => compare(CompareOp::StrictNeq, op, args),
        ">" => compare(CompareOp::Gt, op, args),
        ">=" => compare(CompareOp::Gte, op, args),
        "<" => between(CompareOp::Lt, op, args),
        "<=" => between(CompareOp::Lte, op, args),
        "and" => {
            arity(op, args, "at least 1", |n| n >= 1)?;
            Ok(Expr::And(decode_all(args)?))
        }
        "or" => {
            arity(op, args, "at least 1", |n| n >= 1)?;
            Ok(Expr::Or(decode_all(args)?))
        }
        "!" => {
            arity(op, args, "1", |n| n == 1)?;
            Ok(Expr::Not(Box::new(decode(&args[0])?)))
        }
        "!!" => {
            arity(op, args, "1", |n| n == 1)?;
            Ok(Expr::Truthy(Box::new(decode(&args[0])?)))
        }
        "if" | "?:" => {
            arity(op, args, "at least 1", |n| n >= 1)?;
            let mut decoded = decode_all(args)?;
            let otherwise = if decoded.len() % 2 == 1 {
                decoded.pop().map(Box::new)
            } else {
                None
            };
            let mut branches = Vec::with_capacity(decoded.len() / 2);
            let mut it = decoded.into_iter();
            while let (Some(cond), Some(then)) = (it.next(), it.next()) {
                branches.push((cond, then));
            }
            Ok(Expr::If {
                branches,
                otherwise,
            })
        }
        "in" => {
            arity(op, args, "2", |n| n == 2)?;
            let needle = Box::new(decode(&args[0])?);
            match &args[1] {
                Json::Array(items) => Ok(Expr::In {
                    needle,
                    list: decode_all(items)?,
                }),
                other => Ok(Expr::Contains {
                    haystack: Box::new(decode(other)?),
                    needle,
                }),
            }
        }
        other => Err(ExprError::UnknownOperator {
            op: other.to_owned(),
        }),
    }
}

fn decode_var(args: &[Json]) -> Result<Expr, ExprError> {
    arity("var", args, "1 or 2", |n| n == 1 || n == 2)?;
    let path = match &args[0] {
        Json::String(s) if !s.is_empty() => s.clone(),
        Json::Number(n) => n.to_string(),
        _ => return Err(ExprError::InvalidPath),
    };
    let default = match args.get(1) {
        Some(raw) => Some(Value::from_json(raw).ok_or_else(|| ExprError::NonScalar {
            op: "var".to_owned(),
        })?),
        None => None,
    };
    Ok(Expr::Var { path, default })
}

fn arity(
    op: &str,
    args: &[Json],
    expected: &'static str,
    ok: impl Fn(usize) -> bool,
) -> Result<(), ExprError> {
    if ok(args.len()) {
        Ok(())
    } else {
        Err(ExprError::Arity {
            op: op.to_owned(),
            expected,
            found: args.len(),
        })
    }
}

fn decode_all(args: &[Json]) -> Result<Vec<Expr>, ExprError> {
    args.iter().map(decode).collect()
}

fn arith(
    arith_op: ArithOp,
    op: &str,
    args: &[Json],
    expected: &'static str,
    ok: impl Fn(usize) -> bool,
) -> Result<Expr, ExprError> {
    arity(op, args, expected, ok)?;
    Ok(Expr::Arith {
        op: arith_op,
        args: decode_all(args)?,
    })
}

fn compare(cmp: CompareOp, op: &str, args: &[Json]) -> Result<Expr, ExprError> {
    arity(op, args, "2", |n| n == 2)?;
    Ok(Expr::Compare {
        op: cmp,
        lhs: Box::new(decode(&args[0])?),
        rhs: Box::new(decode(&args[1])?),
    })
}

/// `<` and `<=` also accept three operands: `a < b < c`.
fn between(cmp: CompareOp, op: &str, args: &[Json]) -> Result<Expr, ExprError> {
    arity(op, args, "2 or 3", |n| n == 2 || n == 3)?;
    let mut it = decode_all(args)?.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(lhs), Some(rhs), None) => Ok(Expr::Compare {
            op: cmp,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }),
        (Some(low), Some(mid), Some(high)) => Ok(Expr::And(vec![
            Expr::Compare {
                op: cmp,
                lhs: Box::new(low),
                rhs: Box::new(mid.clone()),
            },
            Expr::Compare {
                op: cmp,
                lhs: Box::new(mid),
                rhs: Box::new(high),
            },
        ])),
        _ => Err(ExprError::Arity {
            op: op.to_owned(),
            expected: "2 or 3",
            found: args.len(),
        }),
    }
}

/// Encode an expression back into its JSON form.
#[must_use]
pub fn encode(expr: &Expr) -> Json {
    match expr {
        Expr::Literal(v) => encode_value(v),
        Expr::Var {
            path,
            default: None,
        } => json!({ "var": path }),
        Expr::Var {
            path,
            default: Some(d),
        } => json!({ "var": [path, encode_value(d)] }),
        Expr::Arith { op, args } => operator(op.to_string(), Json::Array(encode_all(args))),
        Expr::Compare { op, lhs, rhs } => {
            operator(op.to_string(), json!([encode(lhs), encode(rhs)]))
        }
        Expr::And(args) => json!({ "and": encode_all(args) }),
        Expr::Or(args) => json!({ "or": encode_all(args) }),
        Expr::Not(inner) => json!({ "!": [encode(inner)] }),
        Expr::Truthy(inner) => json!({ "!!": [encode(inner)] }),
        Expr::If {
            branches,
            otherwise,
        } => {
            let mut args = Vec::with_capacity(branches.len() * 2 + 1);
            for (cond, then) in branches {
                args.push(encode(cond));
                args.push(encode(then));
            }
            if let Some(other) = otherwise {
                args.push(encode(other));
            }
            json!({ "if": args })
        }
        Expr::In { needle, list } => json!({ "in": [encode(needle), encode_all(list)] }),
        Expr::Contains { haystack, needle } => {
            json!({ "in": [encode(needle), encode(haystack)] })
        }
    }
}

fn operator(op: String, args: Json) -> Json {
    let mut map = Map::with_capacity(1);
    map.insert(op, args);
    Json::Object(map)
}

fn encode_all(args: &[Expr]) -> Vec<Json> {
    args.iter().map(encode).collect()
}

pub(crate) fn encode_value(v: &Value) -> Json {
    match v {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) if n.fract().is_zero() => n
            .to_i64()
            .map_or_else(|| float(*n), Json::from),
        Value::Number(n) => float(*n),
        Value::String(s) => Json::String(s.clone()),
    }
}

fn float(n: Decimal) -> Json {
    n.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(Json::Null, Json::Number)
}
