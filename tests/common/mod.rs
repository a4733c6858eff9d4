// tests/common/mod.rs
// Shared fakes for the tracker integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hiring_tracker::adapters::FetchAdapter;
use hiring_tracker::store::MemoryStore;
use hiring_tracker::{
    Entity, HireRecord, Notifier, PostingRecord, Priority, Record, RecordKind, Store, StoreError,
};

pub fn hire(name: &str, title: &str) -> Record {
    Record::Hire(HireRecord {
        name: name.into(),
        title: title.into(),
        location: String::new(),
        profile_url: None,
        source: "stub".into(),
        discovered_at: Utc::now(),
    })
}

pub fn posting(title: &str, location: &str) -> Record {
    Record::Posting(PostingRecord {
        title: title.into(),
        location: location.into(),
        url: None,
        department: None,
        source: "stub".into(),
        discovered_at: Utc::now(),
    })
}

pub fn entity(id: &str, priority: Priority) -> Entity {
    Entity::new(id, priority).with_hires()
}

/// Adapter answering from a per-entity table and logging every call.
#[derive(Default)]
pub struct StubAdapter {
    responses: HashMap<String, Vec<Record>>,
    failing: HashSet<String>,
    pub calls: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
}

impl StubAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(mut self, entity_id: &str, records: Vec<Record>) -> Self {
        self.responses.insert(entity_id.to_string(), records);
        self
    }

    pub fn failing_for(mut self, entity_id: &str) -> Self {
        self.failing.insert(entity_id.to_string());
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl FetchAdapter for StubAdapter {
    async fn fetch(
        &self,
        entity: &Entity,
        last_checked: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>> {
        self.calls
            .lock()
            .unwrap()
            .push((entity.id.clone(), last_checked));
        if self.failing.contains(&entity.id) {
            return Err(anyhow!("upstream 503 for {}", entity.id));
        }
        Ok(self.responses.get(&entity.id).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Notifier that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, entity: &Entity, record: &Record) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((entity.id.clone(), record.identity_key()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _entity: &Entity, _record: &Record) -> Result<()> {
        Err(anyhow!("webhook down"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Wraps a `MemoryStore` and injects failures per operation.
pub struct FlakyStore {
    pub inner: Arc<MemoryStore>,
    pub fail_list: AtomicBool,
    pub fail_history_for: HashSet<String>,
    pub fail_append_for: HashSet<String>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_list: AtomicBool::new(false),
            fail_history_for: HashSet::new(),
            fail_append_for: HashSet::new(),
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn list_entities(&self) -> Result<Vec<Entity>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("sheet unavailable".into()));
        }
        self.inner.list_entities().await
    }

    async fn recent_records(
        &self,
        entity_id: &str,
        kind: RecordKind,
        window_days: u32,
    ) -> Result<Vec<Record>, StoreError> {
        if self.fail_history_for.contains(entity_id) {
            return Err(StoreError::Backend("read quota exceeded".into()));
        }
        self.inner.recent_records(entity_id, kind, window_days).await
    }

    async fn append_record(&self, entity_id: &str, record: &Record) -> Result<(), StoreError> {
        if self.fail_append_for.contains(entity_id) {
            return Err(StoreError::Backend("write rejected".into()));
        }
        self.inner.append_record(entity_id, record).await
    }
}
