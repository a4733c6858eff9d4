// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod adapters;
pub mod api;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod model;
pub mod notify;
pub mod priority;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::config::TrackerConfig;
pub use crate::dedupe::dedupe;
pub use crate::error::{CycleError, StoreError};
pub use crate::model::{
    CycleResult, Entity, EntityError, HireRecord, PostingRecord, Priority, Record, RecordKind,
};
pub use crate::notify::{Notifier, NotifierMux};
pub use crate::store::Store;
pub use crate::tracker::Tracker;
