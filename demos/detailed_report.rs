use regprice::{FormData, RuleSetBuilder, lit, sum, var, var_or};
use serde_json::json;

fn main() {
    let rules = RuleSetBuilder::new()
        .constant("nightly", 45)
        .camper("lodging", |r| {
            r.price(var_or("camper.nights", 1) * var("pricing.nightly"))
        })
        .camper("per_night_share", |r| {
            r.price(lit(100) / var("camper.nights"))
        })
        .registration("lodging_total", |r| r.price(sum("lodging")))
        .registration("total", |r| {
            r.price(sum("lodging") + sum("per_night_share"))
        })
        .compile()
        .expect("failed to compile rule set");

    let mut camper = serde_json::Map::new();
    camper.insert("nights".into(), json!(0));
    let form = FormData::new().camper(camper).camper(Default::default());

    let report = rules.price_detailed(&form);

    println!("{report}");
    println!();
    for failure in report.failures() {
        println!("unavailable: {failure}");
    }
    println!("Lodging: {:?}", report.result().registration_amount("lodging_total"));
    println!("Duration: {:?}", report.duration());
}
