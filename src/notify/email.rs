// src/notify/email.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use metrics::counter;
use std::time::Duration;

use super::Notifier;
use crate::error::DeliveryError;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

fn env_required(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{key} missing"))
}

/// Comma-separated recipient list; blanks are skipped.
fn parse_recipients(raw: &str) -> Result<Vec<Mailbox>> {
    let to: Vec<Mailbox> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Mailbox>().with_context(|| format!("invalid recipient `{s}`")))
        .collect::<Result<_>>()?;
    if to.is_empty() {
        return Err(anyhow!("NOTIFY_EMAIL_TO has no recipients"));
    }
    Ok(to)
}

impl EmailSender {
    /// Reads `SMTP_HOST`, `SMTP_USER`, `SMTP_PASS`, `NOTIFY_EMAIL_FROM`,
    /// `NOTIFY_EMAIL_TO` and optionally `SMTP_PORT`.
    pub fn from_env() -> Result<Self> {
        let host = env_required("SMTP_HOST")?;
        let user = env_required("SMTP_USER")?;
        let pass = env_required("SMTP_PASS")?;
        let from_addr = env_required("NOTIFY_EMAIL_FROM")?;
        let to_addr = env_required("NOTIFY_EMAIL_TO")?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(Credentials::new(user, pass))
            .timeout(Some(SMTP_TIMEOUT));
        if let Ok(port) = std::env::var("SMTP_PORT") {
            builder = builder.port(port.trim().parse().context("invalid SMTP_PORT")?);
        }

        Ok(Self {
            mailer: builder.build(),
            from: from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?,
            to: parse_recipients(&to_addr)?,
        })
    }

    /// True when every variable `from_env` needs is set.
    pub fn configured() -> bool {
        ["SMTP_HOST", "SMTP_USER", "SMTP_PASS", "NOTIFY_EMAIL_FROM", "NOTIFY_EMAIL_TO"]
            .iter()
            .all(|k| env_required(k).is_ok())
    }

    pub async fn deliver(&self, subject: &str, body: &str, is_html: bool) -> Result<(), DeliveryError> {
        let mut msg = Message::builder().from(self.from.clone());
        for to in &self.to {
            msg = msg.to(to.clone());
        }
        let content_type = if is_html {
            header::ContentType::TEXT_HTML
        } else {
            header::ContentType::TEXT_PLAIN
        };
        let msg = msg
            .subject(subject)
            .header(content_type)
            .body(body.to_string())
            .map_err(|e| DeliveryError(format!("build email: {e}")))?;

        self.mailer
            .send(msg)
            .await
            .map_err(|e| DeliveryError(format!("send email: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailSender {
    async fn send(&self, subject: &str, body: &str, is_html: bool) -> bool {
        match self.deliver(subject, body, is_html).await {
            Ok(()) => {
                tracing::info!(target: "notify", %subject, recipients = self.to.len(), "email sent");
                counter!("notify_sent_total").increment(1);
                true
            }
            Err(e) => {
                tracing::error!(target: "notify", %subject, error = %e, "email delivery failed");
                counter!("notify_failures_total").increment(1);
                false
            }
        }
    }
}
