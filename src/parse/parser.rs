use serde_json::{Map, Value as Json};

use crate::types::{Rule, RuleSetBuilder};

/// The result of parsing a DSL input string.
#[derive(Debug, Default)]
pub struct ParsedRuleSet {
    /// Rules of both scopes, in source order.
    pub rules: Vec<Rule>,
    pub constants: Map<String, Json>,
    /// The rule marked `(total)`, if any. The last marker wins.
    pub total_rule: Option<String>,
}

impl ParsedRuleSet {
    /// A builder holding the parsed rules, constants and total rule.
    #[must_use]
    pub fn into_builder(self) -> RuleSetBuilder {
        let builder = self
            .rules
            .into_iter()
            .fold(RuleSetBuilder::new(), RuleSetBuilder::rule)
            .constants(&self.constants);
        match &self.total_rule {
            Some(name) => builder.total_rule(name),
            None => builder,
        }
    }
}
