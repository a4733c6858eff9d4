use anyhow::{anyhow, Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{Digest, Notifier};
use crate::model::{Entity, Record};

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    /// `Ok(None)` when SMTP_HOST is unset (channel off); `Err` when it is set but the rest is broken.
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            return Ok(None);
        };
        let var = |k: &str| std::env::var(k).map_err(|_| anyhow!("{k} missing"));
        let user = var("SMTP_USER")?;
        let pass = var("SMTP_PASS")?;
        let from_addr = var("NOTIFY_EMAIL_FROM")?;
        let to_addr = var("NOTIFY_EMAIL_TO")?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(Credentials::new(user, pass))
            .build();

        let from = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        let to = to_addr.parse().context("invalid NOTIFY_EMAIL_TO")?;

        Ok(Some(Self { mailer, from, to }))
    }

    async fn send(&self, subject: String, body: String) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, entity: &Entity, record: &Record) -> Result<()> {
        let subject = format!("[{}] {}", entity.display_name(), record.headline());
        let body = format!(
            "Organization: {}\nKind: {}\nTitle: {}\nLocation: {}\nSource: {}\nLink: {}\nFound: {}\n",
            entity.display_name(),
            record.kind().as_str(),
            record.title(),
            record.location(),
            record.source(),
            record.link().unwrap_or("-"),
            record.discovered_at().to_rfc3339()
        );
        self.send(subject, body).await
    }

    async fn notify_digest(&self, digest: &Digest) -> Result<()> {
        self.send(digest.subject(), digest.render_text()).await
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
