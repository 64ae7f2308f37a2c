mod bindings;
mod error;
mod expr;
mod form;
mod result;
mod rule;
mod ruleset;
mod submission;
mod value;

pub use bindings::{Bindings, Lookup};
pub use error::{CompileError, EvalError, VerifyError};
pub(crate) use expr::AGGREGATE_ROOT;
pub use expr::{ArithOp, CompareOp, Expr, if_else, lit, max, min, sum, var, var_or};
pub use form::{Camper, FormData};
pub use result::{PricingReport, PricingResult, RuleAmounts, RuleFailure};
pub use rule::{CompiledRule, Rule, Scope};
pub use ruleset::{DEFAULT_TOTAL_RULE, RuleBuilder, RuleSet, RuleSetBuilder};
pub use submission::{Submission, SubmissionReceipt};
pub(crate) use value::decimal_from_json;
pub use value::Value;
