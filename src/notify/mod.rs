// src/notify/mod.rs
pub mod email;

use async_trait::async_trait;

/// Outbound delivery of one digest. `true` means the message was accepted;
/// anything else blocks the ledger commit for this run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str, is_html: bool) -> bool;
}

/// Logs the digest instead of delivering it (dry-run mode).
///
/// Nothing reaches a recipient, so `send` reports failure and the run never
/// commits: the same records are offered again once real delivery is wired.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, body: &str, is_html: bool) -> bool {
        tracing::info!(
            target: "notify",
            %subject,
            body_len = body.len(),
            is_html,
            "digest logged, not delivered (dry run)"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_never_reports_delivery() {
        assert!(!LogNotifier.send("s", "<p>b</p>", true).await);
    }
}
