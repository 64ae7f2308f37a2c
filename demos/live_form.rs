use regprice::controller::RegistrationController;
use regprice::transport::{JsonConfig, RecordingSink};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG: &str = r#"{
    "event": { "name": "Family Camp" },
    "pricingLogic": {
        "camper": [
            {
                "label": "Tuition",
                "var": "tuition",
                "exp": { "if": [
                    { "<": [{ "var": ["camper.age", 0] }, 12] },
                    { "var": "pricing.child" },
                    { "var": "pricing.adult" }
                ]}
            }
        ],
        "registration": [
            { "var": "total", "exp": { "+": [
                { "sum": "tuition" },
                { "var": ["registration.donation", 0] }
            ]}}
        ]
    },
    "pricing": { "adult": 500, "child": 300 }
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regprice=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut controller = RegistrationController::new("family-camp");
    controller.load(&JsonConfig(CONFIG.to_owned())).await?;

    // Stand-in for the page: redraw whenever new totals are published.
    let mut totals = controller.subscribe();
    let display = tokio::spawn(async move {
        while totals.changed().await.is_ok() {
            let snapshot = totals.borrow_and_update().clone();
            println!(
                "rev {}: {} campers, total {}",
                snapshot.revision, snapshot.camper_count, snapshot.totals.total
            );
        }
    });

    controller.edit(|form| {
        form.campers[0].insert("age".into(), json!(38));
    })?;
    controller.add_camper()?;
    controller.edit(|form| {
        form.campers[1].insert("age".into(), json!(7));
        form.fields.insert("donation".into(), json!(15));
    })?;

    for (slot, price) in controller.prices() {
        println!("{slot}: {}", price.as_deref().unwrap_or("-"));
    }

    let sink = RecordingSink::new();
    let status = controller.submit(&sink).await?;
    println!("submission: {status}");

    drop(controller);
    display.await?;
    Ok(())
}
