use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value as Json};

use super::bindings::Bindings;
use super::error::{CompileError, VerifyError};
use super::expr::Expr;
use super::form::FormData;
use super::result::{PricingReport, PricingResult};
use super::rule::{CompiledRule, Rule, Scope};
use super::submission::Submission;
use crate::config::RegistrationConfig;
use crate::json::ExprError;

/// Name of the registration rule whose amount becomes the total, unless
/// overridden with [`RuleSetBuilder::total_rule`].
pub const DEFAULT_TOTAL_RULE: &str = "total";

/// Builder for constructing a [`RuleSet`].
///
/// Rules are defined via closures and compiled into an immutable, thread-safe
/// pricing structure.
///
/// # Example
///
/// ```
/// use regprice::{RuleSetBuilder, sum, var_or};
///
/// let rules = RuleSetBuilder::new()
///     .constant("nightly", 40)
///     .camper("lodging", |r| {
///         r.price(var_or("camper.nights", 0) * regprice::var("pricing.nightly"))
///             .label("Lodging")
///     })
///     .registration("total", |r| r.price(sum("lodging")))
///     .compile()
///     .unwrap();
/// assert_eq!(rules.camper_rules().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    pub(crate) camper: Vec<Rule>,
    pub(crate) registration: Vec<Rule>,
    pub(crate) constants: Map<String, Json>,
    pub(crate) total_rule: Option<String>,
}

/// Intermediate builder passed to the rule definition closure.
#[derive(Debug, Default)]
pub struct RuleBuilder {
    label: Option<String>,
    expression: Option<Result<Expr, ExprError>>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a camper rule, evaluated once per camper.
    ///
    /// If `.price()` is not called, the rule compiles as defective
    /// ([`CompileError::MissingExpression`]).
    #[must_use]
    pub fn camper(self, name: &str, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        self.define(Scope::Camper, name, f)
    }

    /// Define a registration rule, evaluated once after all campers.
    #[must_use]
    pub fn registration(self, name: &str, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        self.define(Scope::Registration, name, f)
    }

    fn define(self, scope: Scope, name: &str, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        let builder = f(RuleBuilder::default());
        self.rule(Rule {
            name: name.to_owned(),
            scope,
            label: builder.label,
            expression: builder.expression,
        })
    }

    /// Add an already-authored rule to the scope it names.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        match rule.scope {
            Scope::Camper => self.camper.push(rule),
            Scope::Registration => self.registration.push(rule),
        }
        self
    }

    /// Bind a pricing constant, readable as `pricing.<key>` from every rule.
    #[must_use]
    pub fn constant(mut self, key: &str, value: impl Into<Json>) -> Self {
        self.constants.insert(key.to_owned(), value.into());
        self
    }

    /// Bind every entry of a configuration `pricing` map as a constant.
    #[must_use]
    pub fn constants(mut self, constants: &Map<String, Json>) -> Self {
        self.constants
            .extend(constants.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Choose the registration rule whose amount becomes the total.
    #[must_use]
    pub fn total_rule(mut self, name: &str) -> Self {
        self.total_rule = Some(name.to_owned());
        self
    }

    /// Compile the rules into an immutable `RuleSet`.
    ///
    /// Per-rule defects are logged and kept: the rule prices as unavailable
    /// and is listed by [`RuleSet::defects`].
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] for duplicate or empty rule names.
    pub fn compile(self) -> Result<RuleSet, CompileError> {
        crate::compile::compile(self, false)
    }

    /// Like [`compile`](Self::compile), but any per-rule defect is an error.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompileError`] found.
    pub fn compile_strict(self) -> Result<RuleSet, CompileError> {
        crate::compile::compile(self, true)
    }
}

impl RuleBuilder {
    /// Set the price expression for this rule.
    #[must_use]
    pub fn price(mut self, expression: impl Into<Expr>) -> Self {
        self.expression = Some(Ok(expression.into()));
        self
    }

    /// Set the price expression from its JSON form. A malformed expression
    /// makes the rule defective.
    #[must_use]
    pub fn price_json(mut self, expression: &Json) -> Self {
        self.expression = Some(crate::json::decode(expression));
        self
    }

    /// Human-readable name shown beside the amount.
    #[must_use]
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_owned());
        self
    }
}

/// A compiled, immutable rule set. Thread-safe and designed to live behind `Arc`.
#[derive(Debug)]
pub struct RuleSet {
    pub(crate) camper_rules: Vec<CompiledRule>,
    pub(crate) registration_rules: Vec<CompiledRule>,
    pub(crate) constants: Map<String, Json>,
    /// `pricing.*` bindings, built once and cloned per pricing pass.
    pub(crate) pricing: Bindings,
    pub(crate) total_rule: String,
}

impl RuleSet {
    /// Price a registration. See [`compute_pricing`](crate::compute_pricing).
    pub fn price(&self, form: &FormData) -> PricingResult {
        crate::calculate::compute_pricing(self, form)
    }

    /// Price with diagnostics: which rules were unavailable and why, and how
    /// long the pass took.
    pub fn price_detailed(&self, form: &FormData) -> PricingReport {
        crate::calculate::compute_detailed(self, form)
    }

    /// Recompute a submission from its form data and check the submitted
    /// total against it.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::TotalMismatch`] when the totals differ.
    pub fn verify(&self, submission: &Submission) -> Result<PricingResult, VerifyError> {
        crate::calculate::verify(self, submission)
    }

    /// Compile the pricing logic of a registration configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] for duplicate or empty rule names.
    pub fn from_config(config: &RegistrationConfig) -> Result<Self, CompileError> {
        config.rule_set_builder().compile()
    }

    /// Parse a registration configuration from JSON and compile its pricing
    /// logic.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`](crate::PricingError) on JSON or compile failure.
    pub fn from_json_str(input: &str) -> Result<Self, crate::PricingError> {
        let config: RegistrationConfig = serde_json::from_str(input)?;
        Ok(Self::from_config(&config)?)
    }

    /// Parse a DSL string and compile into a `RuleSet`.
    ///
    /// This is a convenience method combining [`parse`](crate::parse::parse)
    /// and [`RuleSetBuilder::compile()`].
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`](crate::PricingError) on parse or compile failure.
    pub fn from_dsl(input: &str) -> Result<Self, crate::PricingError> {
        let parsed = crate::parse::parse(input)?;
        Ok(parsed.into_builder().compile()?)
    }

    /// Read a DSL file and compile into a `RuleSet`.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`](crate::PricingError) on I/O, parse, or compile failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::PricingError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_dsl(&input)
    }

    /// Camper rules in presentation order.
    #[must_use]
    pub fn camper_rules(&self) -> &[CompiledRule] {
        &self.camper_rules
    }

    /// Registration rules in presentation order.
    #[must_use]
    pub fn registration_rules(&self) -> &[CompiledRule] {
        &self.registration_rules
    }

    /// Look up a rule by scope and name.
    #[must_use]
    pub fn rule(&self, scope: Scope, name: &str) -> Option<&CompiledRule> {
        self.rules(scope).iter().find(|r| r.name == name)
    }

    pub(crate) fn rules(&self, scope: Scope) -> &[CompiledRule] {
        match scope {
            Scope::Camper => &self.camper_rules,
            Scope::Registration => &self.registration_rules,
        }
    }

    #[must_use]
    pub fn total_rule(&self) -> &str {
        &self.total_rule
    }

    /// The pricing constants, as configured.
    #[must_use]
    pub fn constants(&self) -> &Map<String, Json> {
        &self.constants
    }

    /// Every rule that compiled with a defect, camper rules first.
    #[must_use]
    pub fn defects(&self) -> Vec<(Scope, &CompileError)> {
        let camper = self
            .camper_rules
            .iter()
            .filter_map(|r| r.defect().map(|e| (Scope::Camper, e)));
        let registration = self
            .registration_rules
            .iter()
            .filter_map(|r| r.defect().map(|e| (Scope::Registration, e)));
        camper.chain(registration).collect()
    }

    /// Variable paths read by the valid rules of a scope, sorted.
    ///
    /// Useful for checking a form schema against the pricing logic.
    #[must_use]
    pub fn referenced_fields(&self, scope: Scope) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        for expr in self.rules(scope).iter().filter_map(CompiledRule::expression) {
            expr.for_each_var(&mut |path| {
                fields.insert(path);
            });
        }
        fields
    }
}

fn write_rules(f: &mut fmt::Formatter<'_>, scope: Scope, rules: &[CompiledRule], total: &str) -> fmt::Result {
    for rule in rules {
        write!(f, "{scope} {}", rule.name)?;
        if let Some(label) = &rule.label {
            write!(f, " {label:?}")?;
        }
        if scope == Scope::Registration && rule.name == total {
            write!(f, " (total)")?;
        }
        match &rule.body {
            Ok(expr) => writeln!(f, ": {expr}")?,
            Err(e) => writeln!(f, ": null  # defective: {e}")?,
        }
    }
    Ok(())
}

/// Renders the rule set in DSL form.
impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.constants {
            match value {
                Json::Object(_) | Json::Array(_) => writeln!(f, "# pricing {key} = {value}")?,
                scalar => writeln!(f, "pricing {key} = {scalar}")?,
            }
        }
        write_rules(f, Scope::Camper, &self.camper_rules, &self.total_rule)?;
        write_rules(
            f,
            Scope::Registration,
            &self.registration_rules,
            &self.total_rule,
        )
    }
}
