use proptest::prelude::*;
use regprice::{
    Camper, Expr, FormData, RuleSet, RuleSetBuilder, if_else, lit, max, min, sum, var, var_or,
};
use rust_decimal::Decimal;
use serde_json::json;

// --- Fixed form schema ---
// camper.age      : integer (0..=80), sometimes absent
// camper.lodging  : string, one of {"tent", "cabin", "lodge"}, sometimes absent
// camper.nights   : integer (0..=14), sometimes absent
// registration.donation : amount with two decimals, sometimes absent

const LODGING: &[&str] = &["tent", "cabin", "lodge"];

/// Generate one camper record; every field may be missing.
pub fn arb_camper() -> impl Strategy<Value = Camper> {
    (
        prop::option::of(0_i64..=80),
        prop::option::of(prop::sample::select(LODGING)),
        prop::option::of(0_i64..=14),
    )
        .prop_map(|(age, lodging, nights)| {
            let mut camper = Camper::new();
            if let Some(age) = age {
                camper.insert("age".into(), json!(age));
            }
            if let Some(lodging) = lodging {
                camper.insert("lodging".into(), json!(lodging));
            }
            if let Some(nights) = nights {
                camper.insert("nights".into(), json!(nights));
            }
            camper
        })
}

/// Generate form data with up to `max_campers` campers.
pub fn arb_form(max_campers: usize) -> impl Strategy<Value = FormData> {
    (
        prop::collection::vec(arb_camper(), 0..=max_campers),
        prop::option::of(0_i64..=10_000),
    )
        .prop_map(|(campers, donation)| {
            let form = FormData {
                campers,
                ..FormData::default()
            };
            match donation {
                Some(cents) => form.field("donation", Decimal::new(cents, 2).to_string()),
                None => form,
            }
        })
}

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0_i64..=50_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// A leaf a camper rule can price with. Fields always carry a fallback.
fn arb_camper_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        arb_amount().prop_map(lit),
        Just(var_or("camper.age", 0)),
        Just(var_or("camper.nights", 1)),
        Just(var("pricing.adult")),
        Just(var("pricing.child")),
    ]
}

fn arb_condition() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0_i64..=80).prop_map(|age| var_or("camper.age", 0).lt(age)),
        prop::sample::select(LODGING)
            .prop_map(|lodging| var("camper.lodging").is_in([lit(lodging)])),
        (0_i64..=14).prop_map(|nights| var_or("camper.nights", 1).gte(nights)),
    ]
}

/// Generate a camper expression tree of bounded depth. Never divides, so
/// pricing it cannot fail.
pub fn arb_camper_expr(max_depth: u32) -> impl Strategy<Value = Expr> {
    arb_camper_leaf().prop_recursive(max_depth, 12, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a + b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a - b),
            (inner.clone(), 0_i64..=3).prop_map(|(a, k)| a * lit(k)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| min([a, b])),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| max([a, b])),
            (arb_condition(), inner.clone(), inner).prop_map(|(c, a, b)| if_else(c, a, b)),
        ]
    })
}

/// A generated rule set: camper rules plus a `total` summing all of them
/// and the donation.
#[derive(Debug, Clone)]
pub struct GenRuleSet {
    pub camper_rules: Vec<(String, Expr)>,
}

impl GenRuleSet {
    /// Compile into an actual `RuleSet`.
    ///
    /// # Panics
    ///
    /// Panics if the generated rule set fails to compile (should not happen
    /// with valid generators).
    #[must_use]
    pub fn compile(&self) -> RuleSet {
        self.builder()
            .compile_strict()
            .expect("generated rule set should compile")
    }

    #[must_use]
    pub fn builder(&self) -> RuleSetBuilder {
        let mut builder = RuleSetBuilder::new()
            .constant("adult", 500)
            .constant("child", json!(312.5));
        let mut total = var_or("registration.donation", 0);
        for (name, expr) in &self.camper_rules {
            let expr = expr.clone();
            builder = builder.camper(name, move |r| r.price(expr));
            total = total + sum(name);
        }
        for (name, _) in &self.camper_rules {
            let aggregate = sum(name);
            builder = builder.registration(&format!("all_{name}"), move |r| r.price(aggregate));
        }
        builder.registration("total", move |r| r.price(total))
    }
}

/// Generate 1..=4 camper rules with random expressions.
pub fn arb_ruleset() -> impl Strategy<Value = GenRuleSet> {
    prop::collection::vec(arb_camper_expr(3), 1..=4).prop_map(|exprs| GenRuleSet {
        camper_rules: exprs
            .into_iter()
            .enumerate()
            .map(|(i, expr)| (format!("rule_{i}"), expr))
            .collect(),
    })
}
