use regprice::parse::parse;
use regprice::{FormData, PricingError, RuleSet, Scope, lit, sum, var_or};
use rust_decimal::{Decimal, dec};
use serde_json::json;

const FAMILY_CAMP: &str = r#"
# Family camp, summer session
pricing adult = 500
pricing child = 300
pricing cabin = 120
pricing sibling_discount = 50

camper tuition "Tuition":
    if (camper.age ?? 0) < 12 then pricing.child else pricing.adult

camper lodging "Lodging":
    if camper.lodging in ["cabin", "lodge"] then pricing.cabin else 0

registration discount "Sibling discount":
    -(max(camper_count - 1, 0) * pricing.sibling_discount)

registration total (total):
    sum(tuition) + sum(lodging) + (registration.donation ?? 0)
        - max(camper_count - 1, 0) * pricing.sibling_discount
"#;

fn camper(age: i64, lodging: &str) -> serde_json::Map<String, serde_json::Value> {
    let mut c = serde_json::Map::new();
    c.insert("age".into(), json!(age));
    c.insert("lodging".into(), json!(lodging));
    c
}

#[test]
fn dsl_prices_a_family() {
    let rules = RuleSet::from_dsl(FAMILY_CAMP).unwrap();
    let form = FormData::new()
        .camper(camper(8, "cabin"))
        .camper(camper(35, "tent"))
        .camper(camper(10, "lodge"))
        .field("donation", 12.5);

    let result = rules.price(&form);
    assert_eq!(result.camper_amount(1, "tuition"), Some(dec!(500)));
    assert_eq!(result.registration_amount("discount"), Some(dec!(-100)));
    assert_eq!(result.total, dec!(1252.50));
}

#[test]
fn dsl_and_builder_agree() {
    let from_dsl = RuleSet::from_dsl(
        r#"
camper fee: camper.nights ?? 1 * 40
registration total: sum(fee)
"#,
    )
    .unwrap();
    let built = regprice::RuleSetBuilder::new()
        .camper("fee", |r| r.price(var_or("camper.nights", 1) * lit(40)))
        .registration("total", |r| r.price(sum("fee")))
        .compile()
        .unwrap();

    let mut three_nights = serde_json::Map::new();
    three_nights.insert("nights".into(), json!(3));
    let form = FormData::new().camper(three_nights).camper(Default::default());

    assert_eq!(from_dsl.price(&form), built.price(&form));
    assert_eq!(from_dsl.price(&form).total, dec!(160));
}

#[test]
fn constants_and_total_marker() {
    let parsed = parse(FAMILY_CAMP).unwrap();
    assert_eq!(parsed.constants["adult"], json!(500));
    assert_eq!(parsed.total_rule.as_deref(), Some("total"));
    assert_eq!(parsed.rules.len(), 4);
    assert_eq!(parsed.rules[0].label.as_deref(), Some("Tuition"));
}

#[test]
fn custom_total_rule() {
    let rules = RuleSet::from_dsl(
        r#"
camper fee: 10
registration subtotal: sum(fee)
registration grand_total (total): sum(fee) * 2
"#,
    )
    .unwrap();
    assert_eq!(rules.total_rule(), "grand_total");
    let result = rules.price(&FormData::with_default_camper());
    assert_eq!(result.total, dec!(20));
    assert_eq!(result.registration_amount("subtotal"), Some(dec!(10)));
}

#[test]
fn negative_constants() {
    let parsed = parse("pricing early_bird = -25.5").unwrap();
    assert_eq!(parsed.constants["early_bird"], json!(-25.5));
}

#[test]
fn display_output_parses_back() {
    let rules = RuleSet::from_dsl(FAMILY_CAMP).unwrap();
    let rendered = rules.to_string();
    let reparsed = RuleSet::from_dsl(&rendered).unwrap();

    let form = FormData::new().camper(camper(9, "cabin")).camper(camper(40, "tent"));
    assert_eq!(reparsed.price(&form), rules.price(&form));
    assert_eq!(reparsed.total_rule(), "total");
}

#[test]
fn unreachable_field_is_isolated() {
    let rules = RuleSet::from_dsl(
        r#"
camper fee: 100
registration oops: camper.age * 2
registration total: sum(fee)
"#,
    )
    .unwrap();
    let defects = rules.defects();
    assert_eq!(defects.len(), 1);
    assert_eq!(defects[0].0, Scope::Registration);
    assert_eq!(rules.price(&FormData::with_default_camper()).total, dec!(100));
}

#[test]
fn parse_error_has_position() {
    let err = RuleSet::from_dsl("camper fee:\n    10 +\n").unwrap_err();
    let PricingError::Parse(err) = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert!(err.line() > 1);
}

#[test]
fn parse_error_on_missing_colon() {
    let err = parse("camper fee 10").unwrap_err();
    assert_eq!(err.line(), 1);
    assert!(err.to_string().starts_with("parse error at 1:"));
}

#[test]
fn total_marker_on_camper_rule_is_rejected() {
    assert!(parse("camper fee (total): 10").is_err());
}

#[test]
fn default_only_applies_to_fields() {
    assert!(parse("camper fee: (1 + 2) ?? 0").is_err());
}

#[test]
fn comments_and_blank_lines() {
    let parsed = parse(
        r#"
# leading comment

camper fee: 5 # trailing comment
# between
registration total: sum(fee)
"#,
    )
    .unwrap();
    assert_eq!(parsed.rules.len(), 2);
    assert_eq!(parsed.rules[0].expression.clone().unwrap().unwrap(), lit(5));
}

#[test]
fn contains_needs_strings() {
    let rules = RuleSet::from_dsl(
        r#"
camper promo: if "VIP" in camper.code then 0 - 50 else 0
registration total: sum(promo)
"#,
    )
    .unwrap();

    let mut vip = serde_json::Map::new();
    vip.insert("code".into(), json!("SUMMER-VIP-26"));
    let mut numeric = serde_json::Map::new();
    numeric.insert("code".into(), json!(1234));
    let form = FormData::new().camper(vip).camper(numeric);

    let result = rules.price(&form);
    assert_eq!(result.camper_amount(0, "promo"), Some(dec!(-50)));
    assert_eq!(result.camper_amount(1, "promo"), Some(Decimal::ZERO));
}

#[test]
fn from_file_reads_dsl() {
    let path = std::env::temp_dir().join(format!("regprice-{}.rules", std::process::id()));
    std::fs::write(&path, FAMILY_CAMP).unwrap();
    let rules = RuleSet::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(rules.camper_rules().len(), 2);
}

#[test]
fn from_file_missing_is_io_error() {
    let err = RuleSet::from_file("/definitely/not/here.rules").unwrap_err();
    assert!(matches!(err, PricingError::Io(_)));
}
