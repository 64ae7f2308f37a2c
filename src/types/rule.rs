use std::fmt;

use super::error::CompileError;
use super::expr::Expr;
use crate::json::ExprError;

/// Which part of the registration a rule prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Evaluated once per camper.
    Camper,
    /// Evaluated once per registration, after all campers.
    Registration,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Camper => write!(f, "camper"),
            Scope::Registration => write!(f, "registration"),
        }
    }
}

/// A named pricing rule as authored, before validation.
///
/// Rules are created via [`RuleSetBuilder`](super::RuleSetBuilder), decoded
/// from a [`RegistrationConfig`](crate::RegistrationConfig), or parsed from
/// the DSL. The expression is `None` until set with
/// [`RuleBuilder::price()`](super::RuleBuilder::price); `Err` when
/// decoding the configured expression failed.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub scope: Scope,
    pub label: Option<String>,
    pub expression: Option<Result<Expr, ExprError>>,
}

/// A validated rule stored inside a [`RuleSet`](super::RuleSet).
///
/// A rule with a defect is kept in place so its slot in the pricing result
/// still exists; it always prices as unavailable.
#[derive(Debug)]
pub struct CompiledRule {
    pub(crate) name: String,
    pub(crate) label: Option<String>,
    pub(crate) body: Result<Expr, CompileError>,
}

impl CompiledRule {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The validated expression, or `None` if the rule is defective.
    #[must_use]
    pub fn expression(&self) -> Option<&Expr> {
        self.body.as_ref().ok()
    }

    #[must_use]
    pub fn defect(&self) -> Option<&CompileError> {
        self.body.as_ref().err()
    }
}
