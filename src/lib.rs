//! Live pricing for event registration forms.
//!
//! Pricing logic is a list of named expressions in two scopes: camper rules
//! run once per camper, registration rules run once per registration and can
//! read per-camper sums. A [`RuleSet`] is compiled once from configuration
//! (JSON or the text DSL) and then prices any [`FormData`] without side
//! effects. The [`controller`] module keeps a registration page's totals in
//! step with its form, and [`present`] turns totals into display strings.
//!
//! ```
//! use regprice::{FormData, RuleSetBuilder, lit, sum};
//!
//! let rules = RuleSetBuilder::new()
//!     .camper("subtotal", |r| r.price(lit(25)))
//!     .registration("total", |r| r.price(sum("subtotal")))
//!     .compile()
//!     .unwrap();
//!
//! let form = FormData::new().camper(Default::default()).camper(Default::default());
//! assert_eq!(rules.price(&form).total, rust_decimal::Decimal::from(50));
//! ```

mod calculate;
mod compile;
pub mod config;
pub mod controller;
mod error;
mod evaluate;
pub mod json;
pub mod parse;
pub mod present;
pub mod transport;
mod types;

pub use calculate::compute_pricing;
pub use config::RegistrationConfig;
pub use error::{ControllerError, PricingError};
pub use evaluate::evaluate;
pub use types::{
    ArithOp, Bindings, Camper, CompareOp, CompileError, CompiledRule, DEFAULT_TOTAL_RULE, EvalError,
    Expr, FormData, Lookup, PricingReport, PricingResult, RuleAmounts, RuleBuilder, RuleFailure,
    Rule, RuleSet, RuleSetBuilder, Scope, Submission, SubmissionReceipt, Value, VerifyError,
    if_else, lit, max, min, sum, var, var_or,
};
