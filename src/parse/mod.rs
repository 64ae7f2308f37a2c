//! Text DSL for pricing rules.
//!
//! ```text
//! pricing adult = 500
//! pricing child = 300
//!
//! camper tuition "Tuition":
//!     if camper.age < 12 then pricing.child else pricing.adult
//!
//! registration total (total):
//!     sum(tuition) + registration.donation ?? 0
//! ```

mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::ParsedRuleSet;

/// Parse a DSL input string into a [`ParsedRuleSet`].
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid DSL syntax.
pub fn parse(input: &str) -> Result<ParsedRuleSet, ParseError> {
    use winnow::Parser;
    grammar::parse_ruleset
        .parse(input)
        .map_err(|e| ParseError::at(input, e.offset(), e.inner().to_string()))
}
