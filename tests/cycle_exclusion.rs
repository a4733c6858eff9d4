// tests/cycle_exclusion.rs
mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{entity, hire, FlakyStore};
use hiring_tracker::adapters::FetchAdapter;
use hiring_tracker::config::DelayConfig;
use hiring_tracker::store::MemoryStore;
use hiring_tracker::{CycleError, Entity, Priority, Record, Tracker};
use tokio::sync::Notify;

/// Blocks inside `fetch` until released; tracks concurrent entries.
#[derive(Default)]
struct GateAdapter {
    entered: Notify,
    release: Notify,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[async_trait]
impl FetchAdapter for GateAdapter {
    async fn fetch(&self, _e: &Entity, _l: Option<DateTime<Utc>>) -> Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![hire("Ann", "Dev")])
    }

    fn name(&self) -> &'static str {
        "gate"
    }
}

#[tokio::test]
async fn second_trigger_while_running_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let gate = Arc::new(GateAdapter::default());
    let tracker = Arc::new(
        Tracker::new(store.clone())
            .with_hire_adapter(gate.clone())
            .with_delays(DelayConfig::none()),
    );

    let t = tracker.clone();
    let first = tokio::spawn(async move { t.run_cycle(&[entity("A", Priority::High)]).await });

    gate.entered.notified().await;
    assert!(tracker.is_running());

    let second = tracker.run_cycle(&[entity("B", Priority::High)]).await;
    assert!(second.is_empty());
    assert_eq!(gate.calls.load(Ordering::SeqCst), 1);

    gate.release.notify_one();
    let first = first.await.unwrap();
    assert_eq!(first.new_hires.len(), 1);
    assert!(!tracker.is_running());
    assert_eq!(gate.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(store.appends().len(), 1);
    assert_eq!(store.appends()[0].0, "A");

    // Idle again: the next trigger runs.
    gate.release.notify_one();
    let third = tracker.run_cycle(&[entity("C", Priority::Low)]).await;
    assert_eq!(third.new_hires.len(), 1);
    assert_eq!(gate.calls.load(Ordering::SeqCst), 2);
}

struct PanicOnceAdapter {
    tripped: AtomicBool,
}

#[async_trait]
impl FetchAdapter for PanicOnceAdapter {
    async fn fetch(&self, _e: &Entity, _l: Option<DateTime<Utc>>) -> Result<Vec<Record>> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("adapter bug");
        }
        Ok(vec![])
    }

    fn name(&self) -> &'static str {
        "panic-once"
    }
}

#[tokio::test]
async fn running_flag_cleared_after_panic() {
    let tracker = Arc::new(
        Tracker::new(Arc::new(MemoryStore::new()))
            .with_hire_adapter(Arc::new(PanicOnceAdapter {
                tripped: AtomicBool::new(false),
            }))
            .with_delays(DelayConfig::none()),
    );

    let t = tracker.clone();
    let joined = tokio::spawn(async move { t.run_cycle(&[entity("A", Priority::High)]).await }).await;
    assert!(joined.unwrap_err().is_panic());
    assert!(!tracker.is_running());

    let again = tracker.run_cycle(&[entity("A", Priority::High)]).await;
    assert!(again.errors.is_empty());
}

#[tokio::test]
async fn entity_load_failure_propagates_and_releases() {
    let flaky = FlakyStore::new(Arc::new(MemoryStore::new()));
    flaky.fail_list.store(true, Ordering::SeqCst);
    let tracker = Tracker::new(Arc::new(flaky)).with_delays(DelayConfig::none());

    let err = tracker.run_cycle_from_store().await.unwrap_err();
    assert!(matches!(err, CycleError::LoadEntities(_)));
    assert!(err.to_string().contains("sheet unavailable"));
    assert!(!tracker.is_running());
}

#[tokio::test]
async fn run_from_store_uses_store_entities() {
    let store = Arc::new(MemoryStore::with_entities(vec![
        entity("low", Priority::Low),
        entity("high", Priority::High),
    ]));
    let stub = Arc::new(common::StubAdapter::new().returning("low", vec![hire("Zoe", "PM")]));
    let tracker = Tracker::new(store.clone())
        .with_hire_adapter(stub.clone())
        .with_delays(DelayConfig::none());

    let r = tracker.run_cycle_from_store().await.unwrap();
    assert_eq!(stub.visited(), ["high", "low"]);
    assert_eq!(r.new_hires.len(), 1);
}
