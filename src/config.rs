// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::Priority;

pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";
const ENV_INTERVAL: &str = "TRACKER_INTERVAL_SECS";
const ENV_HTTP_ADDR: &str = "TRACKER_HTTP_ADDR";
const ENV_PEOPLE_SEARCH_KEY: &str = "PEOPLE_SEARCH_API_KEY";

fn default_interval() -> u64 {
    3600
}
fn default_reload() -> u64 {
    6 * 3600
}
fn default_digest() -> u64 {
    24 * 3600
}
fn default_window_days() -> u32 {
    30
}
fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_state_path() -> PathBuf {
    PathBuf::from("state")
}
fn default_timeout() -> u64 {
    20
}
fn default_retries() -> u8 {
    3
}
fn default_lookback_days() -> u32 {
    7
}

/// Inter-entity pause, scaled by tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayConfig {
    pub high_ms: u64,
    pub medium_ms: u64,
    pub low_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            high_ms: 1_000,
            medium_ms: 2_000,
            low_ms: 3_000,
        }
    }
}

impl DelayConfig {
    pub fn none() -> Self {
        Self {
            high_ms: 0,
            medium_ms: 0,
            low_ms: 0,
        }
    }

    pub fn for_priority(&self, p: Priority) -> Duration {
        let ms = match p {
            Priority::High => self.high_ms,
            Priority::Medium => self.medium_ms,
            Priority::Low => self.low_ms,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
    Sheet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    /// State directory for `file`.
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
    /// Web-app base URL for `sheet`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout for `sheet`.
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

fn default_store_timeout() -> u64 {
    15
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            path: default_state_path(),
            url: None,
            token: None,
            timeout_secs: default_store_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeopleSearchConfig {
    /// Disabled when absent.
    #[serde(default)]
    pub url: Option<String>,
    /// "ENV" means: read from PEOPLE_SEARCH_API_KEY
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u8,
    /// Lookback used before the tracker has a `last_checked` mark for an entity.
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: u32,
}

impl Default for PeopleSearchConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: String::new(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            default_lookback_days: default_lookback_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFeedConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

impl Default for JobFeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_reload")]
    pub reload_interval_secs: u64,
    /// 0 disables the digest.
    #[serde(default = "default_digest")]
    pub digest_interval_secs: u64,
    #[serde(default = "default_window_days")]
    pub history_window_days: u32,
    #[serde(default)]
    pub delays: DelayConfig,
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub people_search: PeopleSearchConfig,
    #[serde(default)]
    pub job_feed: JobFeedConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            reload_interval_secs: default_reload(),
            digest_interval_secs: default_digest(),
            history_window_days: default_window_days(),
            delays: DelayConfig::default(),
            http_addr: default_http_addr(),
            store: StoreConfig::default(),
            people_search: PeopleSearchConfig::default(),
            job_feed: JobFeedConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load from an explicit path. TOML or JSON, picked by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tracker config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: TrackerConfig = match ext.as_str() {
            "json" => serde_json::from_str(&content).context("parsing tracker config json")?,
            _ => toml::from_str(&content).context("parsing tracker config toml")?,
        };
        cfg.finish()
    }

    /// Resolution order:
    /// 1) $TRACKER_CONFIG_PATH
    /// 2) config/tracker.toml
    /// 3) config/tracker.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        for candidate in ["config/tracker.toml", "config/tracker.json"] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Self::default().finish()
    }

    /// Env overrides, secret resolution and sanitizing.
    fn finish(mut self) -> Result<Self> {
        if let Some(secs) = std::env::var(ENV_INTERVAL)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.interval_secs = secs;
        }
        if let Ok(addr) = std::env::var(ENV_HTTP_ADDR) {
            if !addr.trim().is_empty() {
                self.http_addr = addr.trim().to_string();
            }
        }

        // Only resolve the secret when the adapter is actually enabled.
        if self.people_search.url.is_some()
            && self.people_search.api_key.trim().eq_ignore_ascii_case("env")
        {
            self.people_search.api_key = std::env::var(ENV_PEOPLE_SEARCH_KEY)
                .map_err(|_| anyhow!("Missing {ENV_PEOPLE_SEARCH_KEY} env var"))?;
        }

        if self.interval_secs == 0 {
            self.interval_secs = 60;
        }
        if self.reload_interval_secs == 0 {
            self.reload_interval_secs = self.interval_secs;
        }
        if self.history_window_days == 0 {
            self.history_window_days = 1;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn toml_with_partial_fields_gets_defaults() {
        env::remove_var(ENV_INTERVAL);
        env::remove_var(ENV_HTTP_ADDR);
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("tracker.toml");
        fs::write(
            &p,
            r#"
history_window_days = 0
interval_secs = 0

[delays]
high_ms = 10
medium_ms = 20
low_ms = 30

[store]
kind = "file"
path = "var/state"
"#,
        )
        .unwrap();

        let cfg = TrackerConfig::load_from(&p).unwrap();
        assert_eq!(cfg.interval_secs, 60);
        assert_eq!(cfg.history_window_days, 1);
        assert_eq!(cfg.delays.for_priority(Priority::Medium), Duration::from_millis(20));
        assert_eq!(cfg.store.kind, StoreKind::File);
        assert_eq!(cfg.store.path, PathBuf::from("var/state"));
        assert_eq!(cfg.store.timeout_secs, 15);
        assert_eq!(cfg.digest_interval_secs, 86_400);
        assert!(cfg.people_search.url.is_none());
    }

    #[serial_test::serial]
    #[test]
    fn api_key_env_indirection() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("tracker.json");
        fs::write(
            &p,
            r#"{"people_search":{"url":"https://api.test","api_key":"ENV"}}"#,
        )
        .unwrap();

        env::remove_var(ENV_PEOPLE_SEARCH_KEY);
        assert!(TrackerConfig::load_from(&p).is_err());

        env::set_var(ENV_PEOPLE_SEARCH_KEY, "k-123");
        let cfg = TrackerConfig::load_from(&p).unwrap();
        assert_eq!(cfg.people_search.api_key, "k-123");
        env::remove_var(ENV_PEOPLE_SEARCH_KEY);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_INTERVAL);

        let d = TrackerConfig::load_default().unwrap();
        assert_eq!(d.interval_secs, 3600);

        fs::create_dir_all("config").unwrap();
        fs::write("config/tracker.toml", "interval_secs = 120\n").unwrap();
        assert_eq!(TrackerConfig::load_default().unwrap().interval_secs, 120);

        let p_env = tmp.path().join("other.toml");
        fs::write(&p_env, "interval_secs = 900\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
        assert_eq!(TrackerConfig::load_default().unwrap().interval_secs, 900);

        env::set_var(ENV_INTERVAL, "30");
        assert_eq!(TrackerConfig::load_default().unwrap().interval_secs, 30);

        env::remove_var(ENV_INTERVAL);
        env::remove_var(ENV_CONFIG_PATH);
        env::set_current_dir(&old).unwrap();
    }
}
