use regprice::{FormData, RuleSet};
use serde_json::json;

fn main() {
    let rules = RuleSet::from_file("demos/family_camp.rules").expect("failed to load rules");

    println!("{rules}");

    let form: FormData = serde_json::from_value(json!({
        "campers": [
            { "name": "Ada", "age": 8, "lodging": "cabin" },
            { "name": "Ben", "age": 35, "lodging": "tent" }
        ],
        "donation": 20
    }))
    .expect("invalid form data");

    let result = rules.price(&form);
    println!("Discount: {:?}", result.registration_amount("discount"));
    println!("Total: {}", result.total);
}
