use regprice::present::{PriceAdapter, SlotSource};
use regprice::{
    CompileError, FormData, PricingError, RegistrationConfig, RuleSet, Scope, Submission,
    VerifyError,
};
use rust_decimal::{Decimal, dec};
use serde_json::{Value as Json, json};

const FAMILY_CAMP: &str = include_str!("fixtures/family_camp.json");

fn camper(value: Json) -> serde_json::Map<String, Json> {
    match value {
        Json::Object(map) => map,
        other => panic!("camper must be an object, got {other}"),
    }
}

fn family() -> FormData {
    FormData::new()
        .camper(camper(json!({ "name": "Ada", "age": 8, "lodging": "cabin" })))
        .camper(camper(json!({ "name": "Ben", "age": 35, "lodging": "tent" })))
        .camper(camper(json!({ "name": "Cy", "age": 10, "lodging": "lodge" })))
        .field("donation", 12.5)
}

#[test]
fn prices_a_family_registration() {
    let rules = RuleSet::from_json_str(FAMILY_CAMP).unwrap();
    let result = rules.price(&family());

    let tuition: Vec<_> = (0..3).map(|i| result.camper_amount(i, "tuition")).collect();
    assert_eq!(tuition, vec![Some(dec!(300)), Some(dec!(500)), Some(dec!(300))]);
    assert_eq!(result.camper_amount(1, "lodging"), Some(Decimal::ZERO));
    assert_eq!(result.registration_amount("discount"), Some(dec!(-100)));
    assert_eq!(result.total, dec!(1252.50));
    assert!(result.is_complete());
}

#[test]
fn empty_registration_is_free() {
    let rules = RuleSet::from_json_str(FAMILY_CAMP).unwrap();
    let result = rules.price(&FormData::new());
    assert_eq!(result.total, Decimal::ZERO);
    assert_eq!(result.registration_amount("discount"), Some(Decimal::ZERO));
}

#[test]
fn rule_labels_survive_loading() {
    let rules = RuleSet::from_json_str(FAMILY_CAMP).unwrap();
    let tuition = rules.rule(Scope::Camper, "tuition").unwrap();
    assert_eq!(tuition.label(), Some("Tuition"));
    assert_eq!(rules.rule(Scope::Registration, "total").unwrap().label(), None);
    assert_eq!(rules.total_rule(), "total");
}

#[test]
fn referenced_fields_per_scope() {
    let rules = RuleSet::from_json_str(FAMILY_CAMP).unwrap();
    let camper: Vec<_> = rules.referenced_fields(Scope::Camper).into_iter().collect();
    assert_eq!(
        camper,
        vec!["camper.age", "camper.lodging", "pricing.adult", "pricing.cabin", "pricing.child"]
    );
    assert!(rules.referenced_fields(Scope::Registration).contains("campers.tuition"));
}

#[test]
fn submitted_totals_are_verified() {
    let rules = RuleSet::from_json_str(FAMILY_CAMP).unwrap();
    let form = family();
    let honest = Submission {
        pricing_results: rules.price(&form),
        form_data: form.clone(),
    };
    assert!(rules.verify(&honest).is_ok());

    let mut tampered = honest;
    tampered.pricing_results.total = dec!(52.50);
    let err = rules.verify(&tampered).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::TotalMismatch { computed, .. } if computed == dec!(1252.50)
    ));
}

#[test]
fn placeholder_pricing_results_still_verify() {
    let rules = RuleSet::from_json_str(FAMILY_CAMP).unwrap();
    let wire = json!({
        "formData": serde_json::to_value(family()).unwrap(),
        "pricingResults": {}
    });
    let submission: Submission = serde_json::from_value(wire).unwrap();
    assert_eq!(submission.pricing_results.total, Decimal::ZERO);

    let err = rules.verify(&submission).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::TotalMismatch { submitted, computed }
            if submitted == Decimal::ZERO && computed == dec!(1252.50)
    ));
}

#[test]
fn submission_serializes_in_camel_case() {
    let rules = RuleSet::from_json_str(FAMILY_CAMP).unwrap();
    let form = FormData::new().camper(camper(json!({ "age": 40 })));
    let submission = Submission {
        pricing_results: rules.price(&form),
        form_data: form,
    };
    let wire = serde_json::to_value(&submission).unwrap();
    assert_eq!(wire["formData"]["campers"][0]["age"], json!(40));
    assert_eq!(wire["pricingResults"]["total"], json!(500.0));

    let back: Submission = serde_json::from_value(wire).unwrap();
    assert_eq!(back.pricing_results.total, dec!(500));
}

#[test]
fn malformed_expression_only_disables_its_rule() {
    let rules = RuleSet::from_json_str(
        r#"{
            "pricingLogic": {
                "camper": [
                    { "var": "fee", "exp": 40 },
                    { "var": "broken", "exp": { "bogus": [1] } }
                ],
                "registration": [{ "var": "total", "exp": { "sum": "fee" } }]
            }
        }"#,
    )
    .unwrap();

    let defects = rules.defects();
    assert_eq!(defects.len(), 1);
    assert!(matches!(defects[0], (Scope::Camper, CompileError::MalformedExpression { .. })));

    let report = rules.price_detailed(&FormData::with_default_camper());
    assert_eq!(report.result().total, dec!(40));
    assert_eq!(report.result().camper_amount(0, "broken"), None);
    assert_eq!(report.failures().len(), 1);
}

#[test]
fn duplicate_rule_names_reject_the_config() {
    let err = RuleSet::from_json_str(
        r#"{
            "pricingLogic": {
                "camper": [
                    { "var": "fee", "exp": 1 },
                    { "var": "fee", "exp": 2 }
                ]
            }
        }"#,
    )
    .unwrap_err();
    assert!(matches!(err, PricingError::Compile(CompileError::DuplicateRule { .. })));
}

#[test]
fn invalid_json_is_reported() {
    let err = RuleSet::from_json_str("{ \"pricingLogic\": ").unwrap_err();
    assert!(matches!(err, PricingError::Json(_)));
}

#[test]
fn adapter_from_config_constants() {
    let config: RegistrationConfig = serde_json::from_str(FAMILY_CAMP).unwrap();
    let rules = RuleSet::from_config(&config).unwrap();
    let adapter = PriceAdapter::from_pricing(&config.pricing)
        .slot("tuition_1", SlotSource::Camper { index: 0, rule: "tuition".into() })
        .slot("grand_total", SlotSource::Total);

    let prices = adapter.render(&rules.price(&family()));
    assert_eq!(prices["pricing_cabin"].as_deref(), Some("$120"));
    assert_eq!(prices["tuition_1"].as_deref(), Some("$300"));
    assert_eq!(prices["grand_total"].as_deref(), Some("$1252.50"));
    assert!(!prices.contains_key("pricing_currency"));
}
