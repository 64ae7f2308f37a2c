use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rule::Scope;

/// Amount per rule name, in rule-set order. `None` marks an unavailable rule.
pub type RuleAmounts = IndexMap<String, Option<Decimal>>;

/// Output of one pricing pass over a registration.
///
/// `campers` holds one entry per input camper, in input order. Rebuilt
/// wholesale on every recomputation; never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct PricingResult {
    pub campers: Vec<RuleAmounts>,
    pub registration: RuleAmounts,
    pub total: Decimal,
}

impl PricingResult {
    /// A result with no campers, no registration rules and a zero total.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Amount of a registration rule. `None` if the rule does not exist or
    /// is unavailable.
    #[must_use]
    pub fn registration_amount(&self, rule: &str) -> Option<Decimal> {
        self.registration.get(rule).copied().flatten()
    }

    /// Amount of a camper rule for the camper at `index`.
    #[must_use]
    pub fn camper_amount(&self, index: usize, rule: &str) -> Option<Decimal> {
        self.campers
            .get(index)
            .and_then(|amounts| amounts.get(rule).copied().flatten())
    }

    /// `true` when every rule produced an amount.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.campers
            .iter()
            .chain(std::iter::once(&self.registration))
            .all(|amounts| amounts.values().all(Option::is_some))
    }
}

/// A rule that produced no amount during a pricing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub scope: Scope,
    /// Camper index for camper-scope failures.
    pub camper: Option<usize>,
    pub rule: String,
    pub reason: String,
}

impl fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.camper {
            Some(i) => write!(f, "camper[{i}].{}: {}", self.rule, self.reason),
            None => write!(f, "registration.{}: {}", self.rule, self.reason),
        }
    }
}

/// Detailed pricing report returned by
/// [`RuleSet::price_detailed()`](super::RuleSet::price_detailed).
///
/// Contains the result, every rule that was unavailable and why, and the
/// wall-clock duration of the pass. Diagnostics only; the submitted totals
/// are the plain [`PricingResult`].
#[derive(Debug, Clone)]
#[must_use]
pub struct PricingReport {
    result: PricingResult,
    failures: Vec<RuleFailure>,
    duration: Duration,
}

impl PricingReport {
    pub(crate) fn new(result: PricingResult, failures: Vec<RuleFailure>, duration: Duration) -> Self {
        Self {
            result,
            failures,
            duration,
        }
    }

    /// The pricing result, same as [`RuleSet::price()`](super::RuleSet::price).
    pub fn result(&self) -> &PricingResult {
        &self.result
    }

    pub fn into_result(self) -> PricingResult {
        self.result
    }

    /// Rules that priced as unavailable, in evaluation order.
    #[must_use]
    pub fn failures(&self) -> &[RuleFailure] {
        &self.failures
    }

    /// Wall-clock duration of the pricing pass.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for PricingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total: {}, campers: {}",
            self.result.total,
            self.result.campers.len()
        )?;
        let failures: Vec<String> = self.failures.iter().map(ToString::to_string).collect();
        write!(f, ", failures: [{}]", failures.join(", "))?;
        write!(f, ", duration: {:?}", self.duration)?;
        Ok(())
    }
}
