//! Outbound notification delegate.
//!
//! The transport (email, webhook, ...) is an external collaborator; the
//! engine only depends on this trait and records the result of every
//! delivery attempt.

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

/// Notifier trait consumed by the transition detector.
///
/// Implementations return the transport's message id on success. A returned
/// error is logged by the caller and never aborts the sweep.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a "monitor went down" alert
    async fn send_down_alert(
        &self,
        recipient: &str,
        url: &str,
        name: Option<&str>,
    ) -> Result<String>;

    /// Deliver a "monitor recovered" alert, with the formatted outage
    /// duration when it could be determined
    async fn send_up_alert(
        &self,
        recipient: &str,
        url: &str,
        name: Option<&str>,
        downtime: Option<&str>,
    ) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    kind: &'a str,
    recipient: &'a str,
    url: &'a str,
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    downtime: Option<&'a str>,
}

/// Notifier that emits alerts as structured log lines. Stands in for the
/// real transport in local runs.
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, payload: &AlertPayload<'_>) -> Result<String> {
        let message_id = Uuid::new_v4().to_string();
        tracing::info!(
            message_id = %message_id,
            alert = %serde_json::to_string(payload)?,
            "notification dispatched"
        );
        Ok(message_id)
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send_down_alert(
        &self,
        recipient: &str,
        url: &str,
        name: Option<&str>,
    ) -> Result<String> {
        self.emit(&AlertPayload { kind: "down", recipient, url, name, downtime: None })
    }

    async fn send_up_alert(
        &self,
        recipient: &str,
        url: &str,
        name: Option<&str>,
        downtime: Option<&str>,
    ) -> Result<String> {
        self.emit(&AlertPayload { kind: "up", recipient, url, name, downtime })
    }
}
