use regprice::{FormData, RuleSetBuilder, if_else, sum, var, var_or};
use serde_json::json;

fn main() {
    // Define rules
    let rules = RuleSetBuilder::new()
        .constant("adult", 500)
        .constant("child", 300)
        .camper("tuition", |r| {
            r.price(if_else(
                var_or("camper.age", 0).lt(12),
                var("pricing.child"),
                var("pricing.adult"),
            ))
            .label("Tuition")
        })
        .registration("total", |r| r.price(sum("tuition")))
        .compile()
        .expect("failed to compile rule set");

    println!("{rules}");

    // Price a registration
    let mut parent = serde_json::Map::new();
    parent.insert("age".into(), json!(41));
    let mut kid = serde_json::Map::new();
    kid.insert("age".into(), json!(9));
    let form = FormData::new().camper(parent).camper(kid);

    let result = rules.price(&form);
    for (i, camper) in result.campers.iter().enumerate() {
        println!("Camper {i}: {camper:?}");
    }
    println!("Total: {}", result.total);
}
