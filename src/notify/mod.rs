// src/notify/mod.rs
pub mod digest;
pub mod discord;
pub mod email;
pub mod slack;

use anyhow::Result;
use metrics::counter;
use std::sync::Arc;

use crate::model::{Entity, Record};

pub use digest::Digest;
pub use discord::DiscordNotifier;
pub use email::EmailNotifier;
pub use slack::SlackNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, entity: &Entity, record: &Record) -> Result<()>;

    /// Periodic summary. Channels that don't do digests keep the default.
    async fn notify_digest(&self, _digest: &Digest) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Best-effort fan-out. Channel errors are logged and counted, never returned.
#[derive(Clone, Default)]
pub struct NotifierMux {
    channels: Vec<Arc<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Channels whose env is present. Missing env just means "channel off".
    pub fn from_env() -> Self {
        let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();
        if let Some(s) = SlackNotifier::from_env() {
            channels.push(Arc::new(s));
        }
        if let Some(d) = DiscordNotifier::from_env() {
            channels.push(Arc::new(d));
        }
        match EmailNotifier::from_env() {
            Ok(Some(e)) => channels.push(Arc::new(e)),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "email channel misconfigured; disabled"),
        }
        tracing::info!(
            channels = ?channels.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "notification channels"
        );
        Self { channels }
    }

    pub fn push(&mut self, channel: Arc<dyn Notifier>) {
        self.channels.push(channel);
    }

    pub async fn notify(&self, entity: &Entity, record: &Record) {
        for ch in &self.channels {
            if let Err(e) = ch.notify(entity, record).await {
                tracing::warn!(channel = ch.name(), entity = %entity.id, error = %e, "notify failed");
                counter!("tracker_notify_errors_total", "channel" => ch.name()).increment(1);
            }
        }
    }

    pub async fn notify_digest(&self, digest: &Digest) {
        for ch in &self.channels {
            if let Err(e) = ch.notify_digest(digest).await {
                tracing::warn!(channel = ch.name(), error = %e, "digest failed");
                counter!("tracker_notify_errors_total", "channel" => ch.name()).increment(1);
            }
        }
    }
}
