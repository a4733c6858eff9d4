// src/telemetry.rs
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tracker_cycles_total", "Tracking cycles completed.");
        describe_counter!(
            "tracker_cycles_skipped_total",
            "Triggers ignored because a cycle was already running."
        );
        describe_counter!(
            "tracker_new_records_total",
            "Records that survived dedup and were persisted."
        );
        describe_counter!("tracker_fetched_total", "Raw records returned by adapters.");
        describe_counter!("tracker_adapter_errors_total", "Adapter fetch failures.");
        describe_counter!("tracker_persist_errors_total", "Store append failures.");
        describe_counter!("tracker_notify_errors_total", "Notification channel failures.");
        describe_histogram!("tracker_cycle_ms", "Cycle wall time in milliseconds.");
        describe_histogram!("tracker_fetch_ms", "Adapter fetch time in milliseconds.");
        describe_histogram!("tracker_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("tracker_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

/// Install the global Prometheus recorder. Call at most once per process.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
    ensure_metrics_described();
    Ok(handle)
}

/// `RUST_LOG` drives the filter (default `hiring_tracker=info,warn`);
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hiring_tracker=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}
