// src/scheduler.rs
//! Periodic harness around the tracker: tracking cycle, entity reload and
//! digest flush on independent intervals, plus a status board for the
//! liveness endpoint.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::TrackerConfig;
use crate::model::{CycleResult, Entity, EntityError};
use crate::notify::digest::DigestCollector;
use crate::notify::NotifierMux;
use crate::tracker::Tracker;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval: Duration,
    pub reload_interval: Duration,
    /// `None` disables the digest.
    pub digest_interval: Option<Duration>,
}

impl From<&TrackerConfig> for SchedulerCfg {
    fn from(c: &TrackerConfig) -> Self {
        Self {
            interval: Duration::from_secs(c.interval_secs.max(1)),
            reload_interval: Duration::from_secs(c.reload_interval_secs.max(1)),
            digest_interval: (c.digest_interval_secs > 0)
                .then(|| Duration::from_secs(c.digest_interval_secs)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub started_at: DateTime<Utc>,
    pub running: bool,
    pub entities: usize,
    pub cycles: u64,
    pub last_reload_at: Option<DateTime<Utc>>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_cycle_ms: Option<u64>,
    pub last_new_hires: usize,
    pub last_new_postings: usize,
    pub last_errors: Vec<EntityError>,
    pub last_failure: Option<String>,
    pub last_digest_at: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            running: false,
            entities: 0,
            cycles: 0,
            last_reload_at: None,
            last_cycle_at: None,
            last_cycle_ms: None,
            last_new_hires: 0,
            last_new_postings: 0,
            last_errors: Vec::new(),
            last_failure: None,
            last_digest_at: None,
        }
    }
}

/// What the harness has seen so far. Read by `/status`.
#[derive(Debug)]
pub struct StatusBoard {
    inner: RwLock<StatusSnapshot>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StatusSnapshot::new(Utc::now())),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn update(&self, f: impl FnOnce(&mut StatusSnapshot)) {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        f(&mut g);
    }

    pub fn record_reload(&self, entities: usize) {
        self.update(|s| {
            s.entities = entities;
            s.last_reload_at = Some(Utc::now());
        });
    }

    pub fn record_cycle(&self, result: &CycleResult, elapsed: Duration) {
        self.update(|s| {
            s.cycles += 1;
            s.last_cycle_at = Some(Utc::now());
            s.last_cycle_ms = Some(elapsed.as_millis() as u64);
            s.last_new_hires = result.new_hires.len();
            s.last_new_postings = result.new_postings.len();
            s.last_errors = result.errors.clone();
            s.last_failure = None;
        });
    }

    pub fn record_failure(&self, message: String) {
        self.update(|s| s.last_failure = Some(message));
    }

    pub fn record_digest(&self) {
        self.update(|s| s.last_digest_at = Some(Utc::now()));
    }
}

pub struct Harness {
    tracker: Arc<Tracker>,
    notifiers: NotifierMux,
    digest: Option<Arc<DigestCollector>>,
    status: Arc<StatusBoard>,
    cfg: SchedulerCfg,
    entities: Vec<Entity>,
}

impl Harness {
    pub fn new(
        tracker: Arc<Tracker>,
        notifiers: NotifierMux,
        digest: Option<Arc<DigestCollector>>,
        status: Arc<StatusBoard>,
        cfg: SchedulerCfg,
    ) -> Self {
        Self {
            tracker,
            notifiers,
            digest,
            status,
            cfg,
            entities: Vec::new(),
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Replace the entity list from the store; on failure keep the previous one.
    pub async fn reload(&mut self) {
        match self.tracker.store().list_entities().await {
            Ok(v) => {
                tracing::info!(entities = v.len(), "entity list reloaded");
                self.status.record_reload(v.len());
                self.entities = v;
            }
            Err(e) => {
                tracing::warn!(error = %e, kept = self.entities.len(), "entity reload failed; keeping previous list");
                self.status.record_failure(format!("entity reload: {e}"));
            }
        }
    }

    pub async fn tick_cycle(&self) -> CycleResult {
        let t0 = std::time::Instant::now();
        let result = self.tracker.run_cycle(&self.entities).await;
        self.status.record_cycle(&result, t0.elapsed());
        for err in &result.errors {
            tracing::warn!(entity = %err.entity_id, error = %err.message, "entity error in cycle");
        }
        result
    }

    /// Send the collected digest, if any. Returns whether something was sent.
    pub async fn flush_digest(&self) -> bool {
        let Some(collector) = &self.digest else {
            return false;
        };
        let digest = collector.take(Utc::now());
        if digest.is_empty() {
            tracing::debug!("digest empty; nothing sent");
            return false;
        }
        self.notifiers.notify_digest(&digest).await;
        self.status.record_digest();
        tracing::info!(hires = digest.hires, postings = digest.postings, "digest sent");
        true
    }

    pub async fn run(mut self) {
        self.reload().await;

        let mut cycle = tokio::time::interval(self.cfg.interval);
        cycle.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut reload = tokio::time::interval(self.cfg.reload_interval);
        reload.set_missed_tick_behavior(MissedTickBehavior::Skip);
        reload.tick().await; // first tick fires immediately; we just reloaded

        // Without a digest interval this branch is parked on a timer that never matters.
        let digest_every = self
            .cfg
            .digest_interval
            .unwrap_or(Duration::from_secs(365 * 24 * 3600));
        let mut digest = tokio::time::interval(digest_every);
        digest.set_missed_tick_behavior(MissedTickBehavior::Skip);
        digest.tick().await;

        loop {
            tokio::select! {
                _ = cycle.tick() => {
                    let _ = self.tick_cycle().await;
                }
                _ = reload.tick() => self.reload().await,
                _ = digest.tick(), if self.cfg.digest_interval.is_some() => {
                    self.flush_digest().await;
                }
            }
        }
    }
}

pub fn spawn_scheduler(harness: Harness) -> JoinHandle<()> {
    tokio::spawn(harness.run())
}
