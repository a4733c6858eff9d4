// src/store/memory.rs
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{within_window, Store};
use crate::error::StoreError;
use crate::model::{Entity, Record, RecordKind};

#[derive(Debug, Default)]
struct Inner {
    entities: Vec<Entity>,
    records: HashMap<String, Vec<Record>>,
    appends: Vec<(String, Record)>,
}

/// In-process store for dev runs and tests. Records every append in order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: Vec<Entity>) -> Self {
        let store = Self::new();
        store.lock().entities = entities;
        store
    }

    pub fn set_entities(&self, entities: Vec<Entity>) {
        self.lock().entities = entities;
    }

    /// Seed history without counting it as an append.
    pub fn seed(&self, entity_id: &str, record: Record) {
        self.lock()
            .records
            .entry(entity_id.to_string())
            .or_default()
            .push(record);
    }

    /// Every `append_record` call seen so far, in call order.
    pub fn appends(&self) -> Vec<(String, Record)> {
        self.lock().appends.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_entities(&self) -> Result<Vec<Entity>, StoreError> {
        Ok(self.lock().entities.clone())
    }

    async fn recent_records(
        &self,
        entity_id: &str,
        kind: RecordKind,
        window_days: u32,
    ) -> Result<Vec<Record>, StoreError> {
        let all = self
            .lock()
            .records
            .get(entity_id)
            .cloned()
            .unwrap_or_default();
        Ok(within_window(all, kind, window_days, Utc::now()))
    }

    async fn append_record(&self, entity_id: &str, record: &Record) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .records
            .entry(entity_id.to_string())
            .or_default()
            .push(record.clone());
        inner.appends.push((entity_id.to_string(), record.clone()));
        Ok(())
    }
}
