use std::time::Instant;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use crate::evaluate::evaluate;
use crate::types::{
    AGGREGATE_ROOT, Bindings, CompiledRule, EvalError, FormData, PricingReport, PricingResult,
    RuleAmounts, RuleFailure, RuleSet, Scope, Submission, Value, VerifyError,
};

/// Decimal places every rule output is rounded to.
const AMOUNT_SCALE: u32 = 2;

/// Price a registration.
///
/// Camper rules run once per camper, in input order, with `camper.*`,
/// `registration.*` and `pricing.*` bound. Registration rules then run once
/// with `campers.<rule>` bound to the sum of each camper rule and
/// `camper_count` to the number of campers. A rule that fails yields `None`
/// without affecting the others.
///
/// Pure: the same rule set and form always produce the same result.
pub fn compute_pricing(rules: &RuleSet, form: &FormData) -> PricingResult {
    let mut failures = Vec::new();
    price(rules, form, &mut failures)
}

pub(crate) fn compute_detailed(rules: &RuleSet, form: &FormData) -> PricingReport {
    let start = Instant::now();
    let mut failures = Vec::new();
    let result = price(rules, form, &mut failures);
    PricingReport::new(result, failures, start.elapsed())
}

pub(crate) fn verify(rules: &RuleSet, submission: &Submission) -> Result<PricingResult, VerifyError> {
    let computed = compute_pricing(rules, &submission.form_data);
    let submitted = round_amount(submission.pricing_results.total);
    if submitted != computed.total {
        warn!(%submitted, computed = %computed.total, "submitted total does not match");
        return Err(VerifyError::TotalMismatch {
            submitted,
            computed: computed.total,
        });
    }
    Ok(computed)
}

fn price(rules: &RuleSet, form: &FormData, failures: &mut Vec<RuleFailure>) -> PricingResult {
    let mut shared = rules.pricing.clone();
    shared.insert_json("registration", &form.fields);

    let campers: Vec<RuleAmounts> = form
        .campers
        .iter()
        .enumerate()
        .map(|(index, camper)| {
            let mut bindings = shared.clone();
            bindings.insert_json("camper", camper);
            price_rules(&rules.camper_rules, &bindings, Scope::Camper, Some(index), failures)
        })
        .collect();

    let mut bindings = shared;
    bindings.insert("camper_count", Value::Number(Decimal::from(form.campers.len())));
    for rule in &rules.camper_rules {
        let path = format!("{AGGREGATE_ROOT}.{}", rule.name);
        match aggregate(&campers, &rule.name) {
            Some(sum) => bindings.insert(&path, Value::Number(sum)),
            None => bindings.insert_unavailable(&path),
        }
    }

    let registration = price_rules(
        &rules.registration_rules,
        &bindings,
        Scope::Registration,
        None,
        failures,
    );
    let total = registration
        .get(&rules.total_rule)
        .copied()
        .flatten()
        .unwrap_or(Decimal::ZERO);

    debug!(campers = campers.len(), %total, failures = failures.len(), "priced registration");

    PricingResult {
        campers,
        registration,
        total,
    }
}

fn price_rules(
    rules: &[CompiledRule],
    bindings: &Bindings,
    scope: Scope,
    camper: Option<usize>,
    failures: &mut Vec<RuleFailure>,
) -> RuleAmounts {
    let mut amounts = RuleAmounts::with_capacity(rules.len());
    for rule in rules {
        let amount = match &rule.body {
            Ok(expr) => match evaluate(expr, bindings).and_then(to_amount) {
                Ok(amount) => Some(amount),
                Err(e) => {
                    warn!(%scope, rule = %rule.name, ?camper, error = %e, "pricing rule unavailable");
                    failures.push(RuleFailure {
                        scope,
                        camper,
                        rule: rule.name.clone(),
                        reason: e.to_string(),
                    });
                    None
                }
            },
            // already reported when the rule set was compiled
            Err(defect) => {
                failures.push(RuleFailure {
                    scope,
                    camper,
                    rule: rule.name.clone(),
                    reason: defect.to_string(),
                });
                None
            }
        };
        amounts.insert(rule.name.clone(), amount);
    }
    amounts
}

/// Sum of one camper rule over all campers. `None` if any camper's amount is
/// unavailable.
fn aggregate(campers: &[RuleAmounts], rule: &str) -> Option<Decimal> {
    campers.iter().try_fold(Decimal::ZERO, |acc, amounts| {
        acc.checked_add(amounts.get(rule).copied().flatten()?)
    })
}

fn to_amount(value: Value) -> Result<Decimal, EvalError> {
    value
        .as_number()
        .map(round_amount)
        .ok_or_else(|| EvalError::NotNumeric {
            value: value.to_string(),
        })
}

fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
