use rust_decimal::Decimal;
use thiserror::Error;

use super::expr::ArithOp;
use super::rule::Scope;
use crate::json::ExprError;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("duplicate {scope} rule name '{name}'")]
    DuplicateRule { scope: Scope, name: String },

    #[error("{scope} rule with an empty name")]
    EmptyName { scope: Scope },

    #[error("{scope} rule name '{name}' contains '.'")]
    DottedName { scope: Scope, name: String },

    #[error("rule '{rule}' has no price expression")]
    MissingExpression { rule: String },

    #[error("malformed expression in rule '{rule}': {source}")]
    MalformedExpression {
        rule: String,
        #[source]
        source: ExprError,
    },

    #[error("field '{field}' is not reachable from {scope} rule '{rule}'")]
    UnreachableField {
        rule: String,
        scope: Scope,
        field: String,
    },

    #[error("rule '{rule}' aggregates unknown camper rule '{reference}'")]
    UnknownAggregate { rule: String, reference: String },
}

/// Failure while evaluating a single rule. Confined to that rule; the other
/// rules of the set still evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("value {value} is not numeric")]
    NotNumeric { value: String },

    #[error("arithmetic overflow in '{op}'")]
    Overflow { op: ArithOp },

    #[error("'{op}' needs at least one argument")]
    NoArguments { op: ArithOp },

    #[error("'{path}' is unavailable")]
    Unavailable { path: String },
}

/// Server-side re-verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("submitted total {submitted} does not match computed total {computed}")]
    TotalMismatch {
        submitted: Decimal,
        computed: Decimal,
    },
}
