// src/notify/digest.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::Notifier;
use crate::model::{Entity, Record, RecordKind};

/// Everything announced since the last flush, grouped by organization.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Digest {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub hires: usize,
    pub postings: usize,
    pub lines: BTreeMap<String, Vec<String>>,
}

impl Digest {
    pub fn empty(since: DateTime<Utc>) -> Self {
        Self {
            since,
            until: since,
            hires: 0,
            postings: 0,
            lines: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hires == 0 && self.postings == 0
    }

    pub fn add(&mut self, entity: &Entity, record: &Record) {
        match record.kind() {
            RecordKind::Hire => self.hires += 1,
            RecordKind::Posting => self.postings += 1,
        }
        self.lines
            .entry(entity.display_name().to_string())
            .or_default()
            .push(record.headline());
    }

    pub fn subject(&self) -> String {
        format!(
            "Tracking digest: {} new hires, {} new postings",
            self.hires, self.postings
        )
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{} → {}\n",
            self.since.format("%Y-%m-%d %H:%M"),
            self.until.format("%Y-%m-%d %H:%M")
        );
        for (org, lines) in &self.lines {
            out.push_str(&format!("\n{org} ({})\n", lines.len()));
            for l in lines {
                out.push_str(&format!("  • {l}\n"));
            }
        }
        out
    }
}

/// Channel that only collects; the scheduler flushes it on the digest interval.
pub struct DigestCollector {
    inner: Mutex<Digest>,
}

impl Default for DigestCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl DigestCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Digest::empty(Utc::now())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Digest> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Hand out the current digest and start a fresh one at `now`.
    pub fn take(&self, now: DateTime<Utc>) -> Digest {
        let mut guard = self.lock();
        let mut out = std::mem::replace(&mut *guard, Digest::empty(now));
        out.until = now;
        out
    }

    pub fn pending(&self) -> usize {
        let d = self.lock();
        d.hires + d.postings
    }
}

#[async_trait::async_trait]
impl Notifier for DigestCollector {
    async fn notify(&self, entity: &Entity, record: &Record) -> Result<()> {
        self.lock().add(entity, record);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "digest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HireRecord, PostingRecord, Priority};

    fn hire(name: &str) -> Record {
        Record::Hire(HireRecord {
            name: name.into(),
            title: "Dev".into(),
            location: String::new(),
            profile_url: None,
            source: "people-search".into(),
            discovered_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn collects_and_resets_on_take() {
        let c = DigestCollector::new();
        let acme = Entity::new("acme", Priority::High);
        let globex = Entity::new("globex", Priority::Low);

        c.notify(&acme, &hire("Ann")).await.unwrap();
        c.notify(&acme, &hire("Bob")).await.unwrap();
        c.notify(
            &globex,
            &Record::Posting(PostingRecord {
                title: "SRE".into(),
                location: "Remote".into(),
                url: None,
                department: None,
                source: "job-feed".into(),
                discovered_at: Utc::now(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(c.pending(), 3);

        let d = c.take(Utc::now());
        assert_eq!((d.hires, d.postings), (2, 1));
        assert_eq!(d.lines["acme"].len(), 2);
        let text = d.render_text();
        assert!(text.contains("acme (2)"));
        assert!(text.contains("New opening: SRE (Remote)"));
        assert!(d.subject().contains("2 new hires, 1 new postings"));

        assert_eq!(c.pending(), 0);
        assert!(c.take(Utc::now()).is_empty());
    }
}
