//! Run a single tracking cycle against the configured store and print the result as JSON.

use anyhow::Context;
use hiring_tracker::{store, telemetry, NotifierMux, Tracker, TrackerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = TrackerConfig::load_default().context("loading tracker config")?;
    let store = store::from_config(&cfg.store)?;
    let tracker = Tracker::from_config(&cfg, store, NotifierMux::from_env());

    let result = tracker.run_cycle_from_store().await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
