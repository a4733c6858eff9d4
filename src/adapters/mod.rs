// src/adapters/mod.rs
//! Source-specific fetchers. The tracker only sees [`FetchAdapter`]; timeouts,
//! retries and in-batch duplicate suppression live in the adapters.

pub mod job_feed;
pub mod people_search;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::model::{Entity, Record};

pub use job_feed::JobFeedAdapter;
pub use people_search::PeopleSearchAdapter;

#[async_trait::async_trait]
pub trait FetchAdapter: Send + Sync {
    /// Raw candidates for `entity`, possibly empty.
    ///
    /// `last_checked` is the tracker's high-water mark for this entity; adapters
    /// may use it as a lookback floor or ignore it.
    async fn fetch(
        &self,
        entity: &Entity,
        last_checked: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>>;

    fn name(&self) -> &'static str;
}
