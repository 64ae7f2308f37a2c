//! Registration configuration as served by the event backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::types::{Rule, RuleSetBuilder, Scope};

/// Everything the registration page needs for one event: the form schemas,
/// event details, pricing logic and pricing constants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationConfig {
    /// JSON Schema of the form. Passed through to the renderer.
    #[serde(default)]
    pub data_schema: Json,
    #[serde(default)]
    pub ui_schema: Json,
    #[serde(default)]
    pub event: Map<String, Json>,
    #[serde(default)]
    pub pricing_logic: PricingLogic,
    /// Constants bound as `pricing.*`.
    #[serde(default)]
    pub pricing: Map<String, Json>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingLogic {
    #[serde(default)]
    pub camper: Vec<LogicEntry>,
    #[serde(default)]
    pub registration: Vec<LogicEntry>,
}

/// One configured rule: `var` names it, `exp` is its JSON expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub var: String,
    pub exp: Json,
}

impl LogicEntry {
    fn to_rule(&self, scope: Scope) -> Rule {
        Rule {
            name: self.var.clone(),
            scope,
            label: self.label.clone(),
            expression: Some(crate::json::decode(&self.exp)),
        }
    }
}

impl RegistrationConfig {
    /// A builder holding this configuration's rules and constants, ready to
    /// compile or to extend.
    #[must_use]
    pub fn rule_set_builder(&self) -> RuleSetBuilder {
        let camper = self
            .pricing_logic
            .camper
            .iter()
            .map(|entry| entry.to_rule(Scope::Camper));
        let registration = self
            .pricing_logic
            .registration
            .iter()
            .map(|entry| entry.to_rule(Scope::Registration));
        camper
            .chain(registration)
            .fold(RuleSetBuilder::new(), RuleSetBuilder::rule)
            .constants(&self.pricing)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_camel_case() {
        let config: RegistrationConfig = serde_json::from_value(json!({
            "dataSchema": { "type": "object" },
            "uiSchema": {},
            "event": { "name": "Family Camp" },
            "pricingLogic": {
                "camper": [
                    { "label": "Tuition", "var": "tuition", "exp": { "var": "pricing.adult" } }
                ],
                "registration": [
                    { "var": "total", "exp": { "var": "campers.tuition" } }
                ]
            },
            "pricing": { "adult": 500 }
        }))
        .unwrap();

        assert_eq!(config.pricing_logic.camper[0].label.as_deref(), Some("Tuition"));
        assert_eq!(config.pricing_logic.registration[0].var, "total");
        assert_eq!(config.pricing["adult"], json!(500));
        assert_eq!(config.event["name"], json!("Family Camp"));
    }

    #[test]
    fn missing_sections_default() {
        let config: RegistrationConfig = serde_json::from_value(json!({})).unwrap();
        assert!(config.pricing_logic.camper.is_empty());
        assert!(config.pricing.is_empty());
    }

    #[test]
    fn builder_keeps_order_and_scope() {
        let config: RegistrationConfig = serde_json::from_value(json!({
            "pricingLogic": {
                "camper": [
                    { "var": "b", "exp": 1 },
                    { "var": "a", "exp": 2 }
                ],
                "registration": [{ "var": "total", "exp": 3 }]
            }
        }))
        .unwrap();
        let rules = config.rule_set_builder().compile().unwrap();
        let names: Vec<&str> = rules.camper_rules().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(rules.registration_rules()[0].name(), "total");
    }
}
