// src/store/mod.rs
//! Persistence seam. The store is the only source of dedup history; the
//! tracker keeps nothing across cycles besides its `last_checked` hints.

pub mod file;
pub mod memory;
pub mod sheet;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::config::{StoreConfig, StoreKind};
use crate::error::StoreError;
use crate::model::{Entity, Record, RecordKind};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sheet::SheetStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Tracked organizations in sheet order.
    async fn list_entities(&self) -> Result<Vec<Entity>, StoreError>;

    /// Records of `kind` persisted for `entity_id` within the last `window_days`.
    async fn recent_records(
        &self,
        entity_id: &str,
        kind: RecordKind,
        window_days: u32,
    ) -> Result<Vec<Record>, StoreError>;

    async fn append_record(&self, entity_id: &str, record: &Record) -> Result<(), StoreError>;
}

/// Shared window filter for backends that hold the raw log locally.
pub(crate) fn within_window(
    records: impl IntoIterator<Item = Record>,
    kind: RecordKind,
    window_days: u32,
    now: DateTime<Utc>,
) -> Vec<Record> {
    let floor = now - Duration::days(i64::from(window_days));
    records
        .into_iter()
        .filter(|r| r.kind() == kind && r.discovered_at() >= floor)
        .collect()
}

/// Build the backend named by the config.
pub fn from_config(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match cfg.kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::File => Arc::new(FileStore::new(&cfg.path)),
        StoreKind::Sheet => {
            let url = cfg
                .url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("store.kind = \"sheet\" requires store.url"))?;
            Arc::new(SheetStore::new(url, cfg.token.clone()).with_timeout(cfg.timeout_secs))
        }
    };
    Ok(store)
}
