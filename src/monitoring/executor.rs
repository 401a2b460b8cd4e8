use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;

use super::detector::{format_downtime, next_state};
use super::prober::Prober;
use super::types::NotificationKind;
use crate::database::Database;
use crate::database::models::{MonitorWithOwner, NotificationLogEntry, StatusCheckRecord};
use crate::notifier::Notifier;

/// Per-monitor check pipeline: probe, record history, overwrite the cached
/// status, then detect the transition and dispatch any owed notification.
pub struct CheckExecutor {
    store: Arc<dyn Database>,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
}

impl CheckExecutor {
    pub fn new(
        store: Arc<dyn Database>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { store, prober, notifier }
    }

    /// Run one full check for a monitor.
    ///
    /// Probe failures classify as `down` and never surface here; a returned
    /// error means the store was unavailable for this check.
    pub async fn check_monitor(&self, entry: &MonitorWithOwner) -> Result<()> {
        let monitor = &entry.monitor;
        let outcome = self.prober.probe(&monitor.url).await;
        let now = SystemTime::now();

        tracing::debug!(
            monitor = %monitor.uuid,
            url = %monitor.url,
            status = %outcome.status,
            latency_ms = ?outcome.latency_ms,
            "probe completed"
        );

        self.store
            .record_status_check(&StatusCheckRecord::from_outcome(monitor.uuid, &outcome, now))
            .await?;
        self.store
            .update_current_status(monitor.uuid, outcome.status, outcome.latency_ms, now)
            .await?;

        let transition = next_state(monitor.status, outcome.status);
        if let Some(kind) = transition.notification {
            self.dispatch_notification(entry, kind, now).await?;
        }

        Ok(())
    }

    /// Deliver one owed notification and log the attempt.
    ///
    /// Send failures are recorded with `success = false` and swallowed; only
    /// store errors propagate.
    async fn dispatch_notification(
        &self,
        entry: &MonitorWithOwner,
        kind: NotificationKind,
        now: SystemTime,
    ) -> Result<()> {
        let monitor = &entry.monitor;

        if !monitor.notifications_enabled {
            tracing::debug!(monitor = %monitor.uuid, kind = %kind, "notifications disabled, skipping");
            return Ok(());
        }

        let downtime = match kind {
            NotificationKind::Up => self.downtime_text(entry, now).await?,
            NotificationKind::Down => None,
        };

        let name = monitor.name.as_deref();
        let sent = match kind {
            NotificationKind::Down => {
                self.notifier.send_down_alert(&entry.owner_email, &monitor.url, name).await
            }
            NotificationKind::Up => {
                self.notifier
                    .send_up_alert(&entry.owner_email, &monitor.url, name, downtime.as_deref())
                    .await
            }
        };

        let (success, error) = match &sent {
            Ok(message_id) => {
                tracing::info!(
                    monitor = %monitor.uuid,
                    kind = %kind,
                    message_id = %message_id,
                    "notification sent"
                );
                (true, None)
            }
            Err(e) => {
                tracing::warn!(monitor = %monitor.uuid, kind = %kind, "notification failed: {e:#}");
                (false, Some(format!("{e:#}")))
            }
        };

        self.store
            .record_notification(&NotificationLogEntry {
                id: None,
                monitor_uuid: monitor.uuid,
                recipient: entry.owner_email.clone(),
                kind,
                success,
                error,
                sent_at: now,
            })
            .await?;

        if success {
            self.store.update_last_notified(monitor.uuid, now).await?;
        }

        Ok(())
    }

    /// Formatted outage duration for a recovery notification.
    ///
    /// Measured from the most recent `down` history record; falls back to
    /// the last-notified timestamp when history has been pruned, and is
    /// omitted when neither exists.
    async fn downtime_text(
        &self,
        entry: &MonitorWithOwner,
        now: SystemTime,
    ) -> Result<Option<String>> {
        let since = match self.store.last_down_check(entry.monitor.uuid, now).await? {
            Some(record) => Some(record.checked_at),
            None => entry.monitor.last_notified_at,
        };

        Ok(since.map(|start| {
            let duration = now.duration_since(start).unwrap_or_default();
            format_downtime(duration)
        }))
    }
}
