// src/adapters/people_search.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::{counter, histogram};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FetchAdapter;
use crate::config::PeopleSearchConfig;
use crate::dedupe::unique_by_identity;
use crate::model::{Entity, HireRecord, Record};

const SOURCE: &str = "people-search";

#[derive(Serialize)]
struct SearchRequest<'a> {
    company: &'a str,
    since: String,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, alias = "people", alias = "data")]
    results: Vec<Person>,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default, alias = "full_name")]
    name: Option<String>,
    #[serde(default, alias = "job_title", alias = "headline")]
    title: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default, alias = "linkedin_url", alias = "url")]
    profile_url: Option<String>,
}

// Backoff doubles from 500ms; the longest wait is 32s.
const MAX_ATTEMPTS: u8 = 8;

/// Recent joiners for an organization from a people-search HTTP API.
pub struct PeopleSearchAdapter {
    url: String,
    api_key: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
    default_lookback: ChronoDuration,
}

impl PeopleSearchAdapter {
    pub fn new(url: String, api_key: String) -> Self {
        Self {
            url,
            api_key,
            client: Client::new(),
            timeout: Duration::from_secs(20),
            max_retries: 3,
            default_lookback: ChronoDuration::days(7),
        }
    }

    /// `None` when no API url is configured.
    pub fn from_config(cfg: &PeopleSearchConfig) -> Option<Self> {
        let url = cfg.url.clone()?;
        Some(
            Self::new(url, cfg.api_key.clone())
                .with_timeout(cfg.timeout_secs)
                .with_retries(cfg.max_retries)
                .with_default_lookback_days(cfg.default_lookback_days),
        )
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Attempts per fetch, clamped to `1..=MAX_ATTEMPTS`.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.clamp(1, MAX_ATTEMPTS);
        self
    }

    pub fn with_default_lookback_days(mut self, days: u32) -> Self {
        self.default_lookback = ChronoDuration::days(i64::from(days));
        self
    }

    fn since(&self, last_checked: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
        last_checked.unwrap_or(now - self.default_lookback)
    }

    async fn post_with_retries(&self, req: &SearchRequest<'_>) -> Result<String> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .timeout(self.timeout)
                .json(req)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(rsp) => return rsp.text().await.context("people-search body"),
                    Err(e) => anyhow!("people-search HTTP error: {e}"),
                },
                Err(e) => anyhow!("people-search request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(attempt, error = %err, "people-search retrying");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

/// Map an API body to hire records. Rows missing a name or title are dropped.
pub fn parse_response(body: &str, now: DateTime<Utc>) -> Result<Vec<Record>> {
    let parsed: SearchResponse =
        serde_json::from_str(body).context("parsing people-search response")?;

    let records = parsed
        .results
        .into_iter()
        .filter_map(|p| {
            let name = p.name.filter(|s| !s.is_empty())?;
            let title = p.title.filter(|s| !s.is_empty())?;
            Some(Record::Hire(HireRecord {
                name,
                title,
                location: p.location.unwrap_or_default(),
                profile_url: p.profile_url,
                source: SOURCE.to_string(),
                discovered_at: now,
            }))
        })
        .collect();

    Ok(unique_by_identity(records))
}

#[async_trait]
impl FetchAdapter for PeopleSearchAdapter {
    async fn fetch(
        &self,
        entity: &Entity,
        last_checked: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>> {
        let t0 = std::time::Instant::now();
        let now = Utc::now();
        let req = SearchRequest {
            company: entity.display_name(),
            since: self.since(last_checked, now).to_rfc3339(),
            limit: 100,
        };

        let body = self
            .post_with_retries(&req)
            .await
            .with_context(|| format!("people-search for {}", entity.id))?;
        let out = parse_response(&body, now)?;

        histogram!("tracker_fetch_ms", "adapter" => SOURCE)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("tracker_fetched_total", "adapter" => SOURCE).increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        SOURCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_count_is_clamped() {
        let a = PeopleSearchAdapter::new("https://api.test".into(), "k".into());
        assert_eq!(a.with_retries(0).max_retries, 1);
        let a = PeopleSearchAdapter::new("https://api.test".into(), "k".into());
        assert_eq!(a.with_retries(u8::MAX).max_retries, MAX_ATTEMPTS);
    }

    #[test]
    fn parses_aliases_and_drops_incomplete_rows() {
        let body = r#"{
            "people": [
                {"full_name": "Ann Lee", "job_title": "Staff Engineer", "location": "Remote",
                 "linkedin_url": "https://example.test/ann"},
                {"name": "No Title"},
                {"name": "", "title": "Ghost"},
                {"name": "ann lee", "title": "staff engineer"},
                {"name": "Bob", "headline": "SRE"}
            ]
        }"#;
        let now = Utc::now();
        let v = parse_response(body, now).unwrap();
        assert_eq!(v.len(), 2);
        match &v[0] {
            Record::Hire(h) => {
                assert_eq!(h.name, "Ann Lee");
                assert_eq!(h.location, "Remote");
                assert_eq!(h.profile_url.as_deref(), Some("https://example.test/ann"));
                assert_eq!(h.discovered_at, now);
            }
            other => panic!("unexpected record {other:?}"),
        }
        assert_eq!(v[1].title(), "SRE");
    }

    #[test]
    fn empty_and_malformed_bodies() {
        assert!(parse_response("{}", Utc::now()).unwrap().is_empty());
        assert!(parse_response("<html>", Utc::now()).is_err());
    }

    #[test]
    fn since_prefers_last_checked() {
        let a = PeopleSearchAdapter::new("http://x".into(), "k".into()).with_default_lookback_days(3);
        let now = Utc::now();
        assert_eq!(a.since(None, now), now - ChronoDuration::days(3));
        let mark = now - ChronoDuration::hours(1);
        assert_eq!(a.since(Some(mark), now), mark);
    }
}
