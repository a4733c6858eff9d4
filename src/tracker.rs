// src/tracker.rs
//! Tracking cycle orchestrator.
//!
//! One cycle walks the entity list in priority order, strictly sequentially:
//! hires then postings per entity, dedup against the store's recent window,
//! persist, notify, pause. Only one cycle runs at a time; a trigger that
//! arrives while a cycle is in flight returns an empty result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};

use crate::adapters::{FetchAdapter, JobFeedAdapter, PeopleSearchAdapter};
use crate::config::{DelayConfig, TrackerConfig};
use crate::dedupe::dedupe;
use crate::error::CycleError;
use crate::model::{CycleResult, Entity, RecordKind};
use crate::notify::NotifierMux;
use crate::priority;
use crate::store::Store;
use crate::telemetry::ensure_metrics_described;

/// Clears the running flag on every exit path, unwinding included.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Tracker {
    store: Arc<dyn Store>,
    hire_adapter: Option<Arc<dyn FetchAdapter>>,
    posting_adapter: Option<Arc<dyn FetchAdapter>>,
    notifiers: NotifierMux,
    window_days: u32,
    delays: DelayConfig,
    running: AtomicBool,
    last_checked: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Tracker {
    pub fn new(store: Arc<dyn Store>) -> Self {
        ensure_metrics_described();
        Self {
            store,
            hire_adapter: None,
            posting_adapter: None,
            notifiers: NotifierMux::default(),
            window_days: 30,
            delays: DelayConfig::default(),
            running: AtomicBool::new(false),
            last_checked: Mutex::new(HashMap::new()),
        }
    }

    /// Wire the production adapters described by `cfg`.
    pub fn from_config(cfg: &TrackerConfig, store: Arc<dyn Store>, notifiers: NotifierMux) -> Self {
        let mut t = Self::new(store)
            .with_notifiers(notifiers)
            .with_window_days(cfg.history_window_days)
            .with_delays(cfg.delays);
        if let Some(ps) = PeopleSearchAdapter::from_config(&cfg.people_search) {
            t = t.with_hire_adapter(Arc::new(ps));
        }
        if cfg.job_feed.enabled {
            t = t.with_posting_adapter(Arc::new(JobFeedAdapter::http(&cfg.job_feed)));
        }
        t
    }

    pub fn with_hire_adapter(mut self, adapter: Arc<dyn FetchAdapter>) -> Self {
        self.hire_adapter = Some(adapter);
        self
    }

    pub fn with_posting_adapter(mut self, adapter: Arc<dyn FetchAdapter>) -> Self {
        self.posting_adapter = Some(adapter);
        self
    }

    pub fn with_notifiers(mut self, notifiers: NotifierMux) -> Self {
        self.notifiers = notifiers;
        self
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days.max(1);
        self
    }

    pub fn with_delays(mut self, delays: DelayConfig) -> Self {
        self.delays = delays;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// High-water mark handed to adapters as a lookback hint.
    pub fn last_checked(&self, entity_id: &str) -> Option<DateTime<Utc>> {
        self.marks().get(entity_id).copied()
    }

    fn marks(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.last_checked.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn try_begin(&self) -> Option<RunningGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(&self.running))
    }

    /// Run one cycle over `entities`. Returns an empty result if a cycle is already running.
    pub async fn run_cycle(&self, entities: &[Entity]) -> CycleResult {
        let Some(_guard) = self.try_begin() else {
            tracing::warn!("tracking cycle already running; trigger ignored");
            counter!("tracker_cycles_skipped_total").increment(1);
            return CycleResult::default();
        };
        self.cycle_body(entities).await
    }

    /// Load the entity list from the store, then run one cycle over it.
    /// A load failure aborts the cycle; the running flag is still cleared.
    pub async fn run_cycle_from_store(&self) -> Result<CycleResult, CycleError> {
        let Some(_guard) = self.try_begin() else {
            tracing::warn!("tracking cycle already running; trigger ignored");
            counter!("tracker_cycles_skipped_total").increment(1);
            return Ok(CycleResult::default());
        };
        let entities = self
            .store
            .list_entities()
            .await
            .map_err(CycleError::LoadEntities)?;
        Ok(self.cycle_body(&entities).await)
    }

    async fn cycle_body(&self, entities: &[Entity]) -> CycleResult {
        let t0 = std::time::Instant::now();
        let ordered = priority::order(entities);
        let mut out = CycleResult::default();

        tracing::info!(entities = ordered.len(), "tracking cycle started");

        let last = ordered.len().saturating_sub(1);
        for (i, entity) in ordered.iter().enumerate() {
            self.process_entity(entity, &mut out).await;

            if i < last {
                let pause = self.delays.for_priority(entity.priority);
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
        }

        counter!("tracker_cycles_total").increment(1);
        histogram!("tracker_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("tracker_last_cycle_ts").set(Utc::now().timestamp() as f64);

        tracing::info!(
            new_hires = out.new_hires.len(),
            new_postings = out.new_postings.len(),
            errors = out.errors.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "tracking cycle finished"
        );
        out
    }

    async fn process_entity(&self, entity: &Entity, out: &mut CycleResult) {
        let started = Utc::now();
        let hint = self.last_checked(&entity.id);

        if entity.track_hires {
            match &self.hire_adapter {
                Some(a) => {
                    self.run_source(entity, a.as_ref(), RecordKind::Hire, hint, out)
                        .await;
                }
                None => tracing::debug!(entity = %entity.id, "hire tracking requested but no adapter configured"),
            }
        }
        if entity.track_postings {
            match &self.posting_adapter {
                Some(a) => {
                    self.run_source(entity, a.as_ref(), RecordKind::Posting, hint, out)
                        .await;
                }
                None => tracing::debug!(entity = %entity.id, "posting tracking requested but no adapter configured"),
            }
        }

        self.marks().insert(entity.id.clone(), started);
    }

    /// Fetch, dedup, persist and notify for one source. Failures land in `out.errors`.
    async fn run_source(
        &self,
        entity: &Entity,
        adapter: &dyn FetchAdapter,
        kind: RecordKind,
        hint: Option<DateTime<Utc>>,
        out: &mut CycleResult,
    ) {
        let raw = match adapter.fetch(entity, hint).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(entity = %entity.id, adapter = adapter.name(), error = ?e, "fetch failed");
                counter!("tracker_adapter_errors_total", "adapter" => adapter.name()).increment(1);
                out.push_error(&entity.id, format!("{}: {e:#}", adapter.name()));
                return;
            }
        };

        let fetched = raw.len();
        let raw: Vec<_> = raw.into_iter().filter(|r| r.kind() == kind).collect();
        if raw.len() != fetched {
            tracing::warn!(
                entity = %entity.id,
                adapter = adapter.name(),
                dropped = fetched - raw.len(),
                "adapter returned records of the wrong kind"
            );
        }
        if raw.is_empty() {
            return;
        }

        let existing = match self
            .store
            .recent_records(&entity.id, kind, self.window_days)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(entity = %entity.id, kind = kind.as_str(), error = %e, "history read failed; batch skipped");
                out.push_error(&entity.id, format!("history read ({}): {e}", kind.as_str()));
                return;
            }
        };

        let survivors = dedupe(&raw, &existing);
        tracing::debug!(
            entity = %entity.id,
            kind = kind.as_str(),
            fetched = raw.len(),
            new = survivors.len(),
            "dedup"
        );

        for record in survivors {
            if let Err(e) = self.store.append_record(&entity.id, &record).await {
                tracing::warn!(entity = %entity.id, record = %record.identity_key(), error = %e, "persist failed; record dropped for this cycle");
                counter!("tracker_persist_errors_total").increment(1);
                continue;
            }
            self.notifiers.notify(entity, &record).await;
            counter!("tracker_new_records_total", "kind" => kind.as_str()).increment(1);
            out.push_survivor(record);
        }
    }
}
