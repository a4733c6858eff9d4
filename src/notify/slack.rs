use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::{Digest, Notifier};
use crate::model::{Entity, Record};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn from_env() -> Option<Self> {
        std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    async fn post_text(&self, text: String) -> Result<()> {
        let body = serde_json::json!({ "text": text });
        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }
}

pub(crate) fn format_record(entity: &Entity, record: &Record) -> String {
    let mut text = format!(
        "*{}* · {}\n_{}_ via {}",
        entity.display_name(),
        record.headline(),
        record.kind().as_str(),
        record.source()
    );
    if let Some(link) = record.link() {
        text.push_str(&format!("\n<{link}>"));
    }
    text
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, entity: &Entity, record: &Record) -> Result<()> {
        self.post_text(format_record(entity, record)).await
    }

    async fn notify_digest(&self, digest: &Digest) -> Result<()> {
        self.post_text(format!("*{}*\n{}", digest.subject(), digest.render_text()))
            .await
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
