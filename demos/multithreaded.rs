use std::sync::Arc;
use std::thread;

use regprice::{FormData, RuleSetBuilder, lit, sum, var_or};
use serde_json::json;

fn main() {
    let rules = Arc::new(
        RuleSetBuilder::new()
            .camper("meals", |r| r.price(var_or("camper.meals", 0) * lit(12)))
            .registration("total", |r| r.price(sum("meals") + lit(35)))
            .compile()
            .expect("failed to compile rule set"),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let rules = Arc::clone(&rules);
            thread::spawn(move || {
                let form = (0..=i).fold(FormData::new(), |form, meals| {
                    let mut camper = serde_json::Map::new();
                    camper.insert("meals".into(), json!(meals * 3));
                    form.camper(camper)
                });

                let result = rules.price(&form);
                println!("Thread {i}: {} campers, total {}", result.campers.len(), result.total);
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}
