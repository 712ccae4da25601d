//! Demo entry point: wires the messaging layer and runs an item lifecycle.

use runtime::{App, Config, telemetry};

#[tokio::main]
async fn main() {
    // 1. Load configuration
    let config = Config::from_env().expect("invalid configuration");

    // 2. Initialize tracing and metrics
    telemetry::init_tracing(&config);
    let metrics_handle = telemetry::init_metrics().expect("failed to install Prometheus recorder");
    tracing::info!(?config, "starting cqrs demo");

    // 3. Wire store, dispatchers, middleware and handlers
    let app = App::new(&config).expect("failed to wire application");

    // 4. Run the demo flow and wait for everything queued to finish
    let item_id = runtime::run_demo(&app).await.expect("demo flow failed");

    let items = app.items().await;
    tracing::info!(
        %item_id,
        item = %items.get(item_id.to_string()).cloned().unwrap_or_default(),
        "final item state"
    );

    // 5. Print the collected metrics
    println!("{}", metrics_handle.render());
}
