//! Tracker daemon: periodic tracking cycles plus the liveness/status HTTP surface.

use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::Context;
use hiring_tracker::api::{self, AppState};
use hiring_tracker::notify::digest::DigestCollector;
use hiring_tracker::scheduler::{spawn_scheduler, Harness, SchedulerCfg, StatusBoard};
use hiring_tracker::{store, telemetry, NotifierMux, Tracker, TrackerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let metrics = match telemetry::install_prometheus() {
        Ok(h) => Some(h),
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled");
            None
        }
    };

    let cfg = TrackerConfig::load_default().context("loading tracker config")?;
    tracing::info!(
        interval_secs = cfg.interval_secs,
        window_days = cfg.history_window_days,
        store = ?cfg.store.kind,
        people_search = cfg.people_search.url.is_some(),
        "config loaded"
    );

    let store = store::from_config(&cfg.store)?;

    let digest = Arc::new(DigestCollector::new());
    let mut mux = NotifierMux::from_env();
    if cfg.digest_interval_secs > 0 {
        mux.push(digest.clone());
    }

    let tracker = Arc::new(Tracker::from_config(&cfg, store, mux.clone()));
    let status = Arc::new(StatusBoard::new());

    let harness = Harness::new(
        tracker.clone(),
        mux,
        (cfg.digest_interval_secs > 0).then_some(digest),
        status.clone(),
        SchedulerCfg::from(&cfg),
    );
    let scheduler = spawn_scheduler(harness);

    let router = api::create_router(AppState {
        tracker,
        status,
        metrics,
    });
    let listener = tokio::net::TcpListener::bind(&cfg.http_addr)
        .await
        .with_context(|| format!("binding {}", cfg.http_addr))?;
    tracing::info!(addr = %cfg.http_addr, "status server listening");

    tokio::select! {
        res = axum::serve(listener, router).into_future() => res.context("status server")?,
        res = scheduler => {
            if let Err(e) = res {
                tracing::error!(error = %e, "scheduler task ended");
            }
        }
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
    }
    Ok(())
}
