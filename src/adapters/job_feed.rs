// src/adapters/job_feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;

use super::FetchAdapter;
use crate::config::JobFeedConfig;
use crate::dedupe::unique_by_identity;
use crate::model::{Entity, PostingRecord, Record};

const SOURCE: &str = "job-feed";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    location: Option<String>,
    category: Option<String>,
}

/// Collapse whitespace, decode entities and strip markup from a feed field.
pub fn clean_field(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));

    let decoded = html_escape::decode_html_entities(s);
    let stripped = re_tags.replace_all(&decoded, "");
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// "Backend Engineer - Berlin", "Backend Engineer | Berlin", "Backend Engineer (Berlin)".
fn split_title_location(title: &str) -> (String, String) {
    static RE_SPLIT: OnceCell<Regex> = OnceCell::new();
    let re = RE_SPLIT.get_or_init(|| {
        Regex::new(r"^(?P<t>.+?)(?:\s+[-|\u{2013}]\s+(?P<l1>[^-|\u{2013}]+)|\s*\((?P<l2>[^()]+)\))$")
            .expect("static regex")
    });
    match re.captures(title) {
        Some(c) => {
            let loc = c
                .name("l1")
                .or_else(|| c.name("l2"))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            (c["t"].trim().to_string(), loc)
        }
        None => (title.to_string(), String::new()),
    }
}

/// Parse one RSS career feed into posting records.
pub fn parse_feed(xml: &str, now: DateTime<Utc>) -> Result<Vec<Record>> {
    let t0 = std::time::Instant::now();
    let rss: Rss = from_str(xml).context("parsing job feed xml")?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let raw_title = clean_field(it.title.as_deref().unwrap_or_default());
        if raw_title.is_empty() {
            continue;
        }
        let (title, location) = match it.location.as_deref().map(clean_field) {
            Some(loc) if !loc.is_empty() => (raw_title, loc),
            _ => split_title_location(&raw_title),
        };
        out.push(Record::Posting(PostingRecord {
            title,
            location,
            url: it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            department: it.category.map(|c| clean_field(&c)).filter(|c| !c.is_empty()),
            source: SOURCE.to_string(),
            discovered_at: now,
        }));
    }

    histogram!("tracker_parse_ms", "adapter" => SOURCE)
        .record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

enum Mode {
    Http { client: reqwest::Client, timeout: Duration },
    // Same body for every entity; used by tests and dry runs.
    Fixture(String),
}

/// Open postings from the RSS career feeds listed in an entity's endpoints.
pub struct JobFeedAdapter {
    mode: Mode,
}

impl JobFeedAdapter {
    pub fn http(cfg: &JobFeedConfig) -> Self {
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
                timeout: Duration::from_secs(cfg.timeout_secs),
            },
        }
    }

    pub fn from_fixture(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    async fn fetch_body(&self, endpoint: &str) -> Result<String> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { client, timeout } => client
                .get(endpoint)
                .timeout(*timeout)
                .send()
                .await
                .with_context(|| format!("job feed get {endpoint}"))?
                .error_for_status()
                .with_context(|| format!("job feed status {endpoint}"))?
                .text()
                .await
                .context("job feed body"),
        }
    }
}

fn is_feed_endpoint(e: &str) -> bool {
    e.starts_with("http://") || e.starts_with("https://")
}

#[async_trait]
impl FetchAdapter for JobFeedAdapter {
    async fn fetch(
        &self,
        entity: &Entity,
        _last_checked: Option<DateTime<Utc>>,
    ) -> Result<Vec<Record>> {
        let now = Utc::now();
        let endpoints: Vec<&str> = match self.mode {
            Mode::Fixture(_) => vec!["fixture"],
            Mode::Http { .. } => entity
                .endpoints
                .iter()
                .map(String::as_str)
                .filter(|e| is_feed_endpoint(e))
                .collect(),
        };
        if endpoints.is_empty() {
            tracing::debug!(entity = %entity.id, "no feed endpoints; nothing to fetch");
            return Ok(Vec::new());
        }

        // One failing feed fails the whole fetch so the tracker records it.
        let mut all = Vec::new();
        for ep in endpoints {
            let body = self.fetch_body(ep).await?;
            all.extend(parse_feed(&body, now).with_context(|| format!("feed {ep}"))?);
        }

        let out = unique_by_identity(all);
        counter!("tracker_fetched_total", "adapter" => SOURCE).increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        SOURCE
    }
}
