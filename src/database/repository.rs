use std::time::SystemTime;

use anyhow::Result;
use async_trait::async_trait;
use libsql::{Row, params};
use uuid::Uuid;

use super::models::{
    CheckStats, Monitor, MonitorWithOwner, NotificationLogEntry, StatusCheckRecord, User,
    millis_to_timestamp, timestamp_to_millis,
};
use crate::monitoring::types::{MonitorStatus, NotificationKind};
use crate::monitoring::validation::validate_monitor_url;
use crate::pool::LibsqlPool;

const MONITOR_COLUMNS: &str = "id, uuid, user_uuid, url, name, status, last_checked_at, \
     last_latency_ms, notifications_enabled, last_notified_at, created_at, updated_at";

/// Database trait for abstracting store operations
#[async_trait]
pub trait Database: Send + Sync {
    /// Save a user (insert or update)
    async fn save_user(&self, user: &User) -> Result<i64>;

    /// Save a monitor (insert or update); validates the target URL
    async fn save_monitor(&self, monitor: &Monitor) -> Result<i64>;

    /// Delete a monitor and its history and notification log
    async fn delete_monitor(&self, uuid: Uuid) -> Result<()>;

    /// Get a monitor by UUID
    async fn get_monitor(&self, uuid: Uuid) -> Result<Option<Monitor>>;

    /// Load all monitors joined with their owner's contact address
    async fn monitors_with_owner(&self) -> Result<Vec<MonitorWithOwner>>;

    /// Load a single monitor joined with its owner's contact address
    async fn monitor_with_owner(&self, uuid: Uuid) -> Result<Option<MonitorWithOwner>>;

    /// Append one status-check history record
    async fn record_status_check(&self, record: &StatusCheckRecord) -> Result<i64>;

    /// Overwrite a monitor's cached status, latency and last-checked fields
    async fn update_current_status(
        &self,
        uuid: Uuid,
        status: MonitorStatus,
        latency_ms: Option<u64>,
        checked_at: SystemTime,
    ) -> Result<()>;

    /// Stamp the time of the last successfully sent notification
    async fn update_last_notified(&self, uuid: Uuid, at: SystemTime) -> Result<()>;

    /// Most recent `down` history record strictly before the given instant
    async fn last_down_check(
        &self,
        uuid: Uuid,
        before: SystemTime,
    ) -> Result<Option<StatusCheckRecord>>;

    /// Recent history records, newest first
    async fn recent_checks(&self, uuid: Uuid, limit: usize) -> Result<Vec<StatusCheckRecord>>;

    /// Aggregate statistics over the trailing window
    async fn check_stats(&self, uuid: Uuid, window_hours: u32) -> Result<CheckStats>;

    /// Append one notification-log entry
    async fn record_notification(&self, entry: &NotificationLogEntry) -> Result<i64>;

    /// Recent notification-log entries, newest first
    async fn notification_log(&self, uuid: Uuid, limit: usize) -> Result<Vec<NotificationLogEntry>>;
}

/// LibSQL store implementation
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Create a new store instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<crate::pool::LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn monitor_from_row(row: &Row) -> Result<Monitor> {
    let uuid_str: String = row.get(1)?;
    let user_uuid_str: String = row.get(2)?;
    let status_str: String = row.get(5)?;

    Ok(Monitor {
        id: Some(row.get(0)?),
        uuid: Uuid::parse_str(&uuid_str)?,
        user_uuid: Uuid::parse_str(&user_uuid_str)?,
        url: row.get(3)?,
        name: row.get::<Option<String>>(4)?,
        status: MonitorStatus::from_db(&status_str),
        last_checked_at: row.get::<Option<i64>>(6)?.map(millis_to_timestamp),
        last_latency_ms: row.get::<Option<i64>>(7)?.map(|v| v as u64),
        notifications_enabled: row.get::<i64>(8)? != 0,
        last_notified_at: row.get::<Option<i64>>(9)?.map(millis_to_timestamp),
        created_at: millis_to_timestamp(row.get(10)?),
        updated_at: millis_to_timestamp(row.get(11)?),
    })
}

fn check_from_row(row: &Row) -> Result<StatusCheckRecord> {
    let monitor_uuid_str: String = row.get(1)?;
    let status_str: String = row.get(2)?;

    Ok(StatusCheckRecord {
        id: Some(row.get(0)?),
        monitor_uuid: Uuid::parse_str(&monitor_uuid_str)?,
        status: MonitorStatus::from_db(&status_str),
        latency_ms: row.get::<Option<i64>>(3)?.map(|v| v as u64),
        error_message: row.get::<Option<String>>(4)?,
        checked_at: millis_to_timestamp(row.get(5)?),
    })
}

#[async_trait]
impl Database for LibsqlStore {
    async fn save_user(&self, user: &User) -> Result<i64> {
        let conn = self.get_conn().await?;

        if let Some(id) = user.id {
            conn.execute(
                "UPDATE users SET email = ? WHERE id = ?",
                params![user.email.clone(), id],
            )
            .await?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO users (uuid, email, created_at) VALUES (?, ?, ?)",
                params![
                    user.uuid.to_string(),
                    user.email.clone(),
                    timestamp_to_millis(user.created_at)
                ],
            )
            .await?;
            Ok(conn.last_insert_rowid())
        }
    }

    async fn save_monitor(&self, monitor: &Monitor) -> Result<i64> {
        validate_monitor_url(&monitor.url)?;

        let conn = self.get_conn().await?;

        if let Some(id) = monitor.id {
            conn.execute(
                "UPDATE monitors SET url = ?, name = ?, notifications_enabled = ?, updated_at = ? \
                 WHERE id = ?",
                params![
                    monitor.url.clone(),
                    monitor.name.clone(),
                    if monitor.notifications_enabled { 1 } else { 0 },
                    timestamp_to_millis(SystemTime::now()),
                    id
                ],
            )
            .await?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO monitors (uuid, user_uuid, url, name, status, last_checked_at, \
                 last_latency_ms, notifications_enabled, last_notified_at, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    monitor.uuid.to_string(),
                    monitor.user_uuid.to_string(),
                    monitor.url.clone(),
                    monitor.name.clone(),
                    monitor.status.to_string(),
                    monitor.last_checked_at.map(timestamp_to_millis),
                    monitor.last_latency_ms.map(|v| v as i64),
                    if monitor.notifications_enabled { 1 } else { 0 },
                    monitor.last_notified_at.map(timestamp_to_millis),
                    timestamp_to_millis(monitor.created_at),
                    timestamp_to_millis(monitor.updated_at)
                ],
            )
            .await?;
            Ok(conn.last_insert_rowid())
        }
    }

    async fn delete_monitor(&self, uuid: Uuid) -> Result<()> {
        let conn = self.get_conn().await?;
        let uuid_str = uuid.to_string();

        // Independent statements; the surrounding CRUD layer may interleave.
        conn.execute("DELETE FROM status_checks WHERE monitor_uuid = ?", params![uuid_str.clone()])
            .await?;
        conn.execute(
            "DELETE FROM notification_log WHERE monitor_uuid = ?",
            params![uuid_str.clone()],
        )
        .await?;
        conn.execute("DELETE FROM monitors WHERE uuid = ?", params![uuid_str]).await?;
        Ok(())
    }

    async fn get_monitor(&self, uuid: Uuid) -> Result<Option<Monitor>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(&format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE uuid = ?"))
            .await?;

        let mut rows = stmt.query(params![uuid.to_string()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(monitor_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn monitors_with_owner(&self) -> Result<Vec<MonitorWithOwner>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT m.id, m.uuid, m.user_uuid, m.url, m.name, m.status, m.last_checked_at, \
                 m.last_latency_ms, m.notifications_enabled, m.last_notified_at, m.created_at, \
                 m.updated_at, u.email \
                 FROM monitors m JOIN users u ON u.uuid = m.user_uuid \
                 ORDER BY m.id",
            )
            .await?;

        let mut rows = stmt.query(()).await?;
        let mut monitors = Vec::new();

        while let Some(row) = rows.next().await? {
            monitors.push(MonitorWithOwner {
                monitor: monitor_from_row(&row)?,
                owner_email: row.get(12)?,
            });
        }

        Ok(monitors)
    }

    async fn monitor_with_owner(&self, uuid: Uuid) -> Result<Option<MonitorWithOwner>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT m.id, m.uuid, m.user_uuid, m.url, m.name, m.status, m.last_checked_at, \
                 m.last_latency_ms, m.notifications_enabled, m.last_notified_at, m.created_at, \
                 m.updated_at, u.email \
                 FROM monitors m JOIN users u ON u.uuid = m.user_uuid \
                 WHERE m.uuid = ?",
            )
            .await?;

        let mut rows = stmt.query(params![uuid.to_string()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(MonitorWithOwner {
                monitor: monitor_from_row(&row)?,
                owner_email: row.get(12)?,
            })),
            None => Ok(None),
        }
    }

    async fn record_status_check(&self, record: &StatusCheckRecord) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO status_checks (monitor_uuid, status, latency_ms, error_message, \
             checked_at) VALUES (?, ?, ?, ?, ?)",
            params![
                record.monitor_uuid.to_string(),
                record.status.to_string(),
                record.latency_ms.map(|v| v as i64),
                record.error_message.clone(),
                timestamp_to_millis(record.checked_at)
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn update_current_status(
        &self,
        uuid: Uuid,
        status: MonitorStatus,
        latency_ms: Option<u64>,
        checked_at: SystemTime,
    ) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.execute(
            "UPDATE monitors SET status = ?, last_latency_ms = ?, last_checked_at = ?, \
             updated_at = ? WHERE uuid = ?",
            params![
                status.to_string(),
                latency_ms.map(|v| v as i64),
                timestamp_to_millis(checked_at),
                timestamp_to_millis(SystemTime::now()),
                uuid.to_string()
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_last_notified(&self, uuid: Uuid, at: SystemTime) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.execute(
            "UPDATE monitors SET last_notified_at = ? WHERE uuid = ?",
            params![timestamp_to_millis(at), uuid.to_string()],
        )
        .await?;
        Ok(())
    }

    async fn last_down_check(
        &self,
        uuid: Uuid,
        before: SystemTime,
    ) -> Result<Option<StatusCheckRecord>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT id, monitor_uuid, status, latency_ms, error_message, checked_at \
                 FROM status_checks \
                 WHERE monitor_uuid = ? AND status = 'down' AND checked_at < ? \
                 ORDER BY checked_at DESC LIMIT 1",
            )
            .await?;

        let mut rows =
            stmt.query(params![uuid.to_string(), timestamp_to_millis(before)]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(check_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn recent_checks(&self, uuid: Uuid, limit: usize) -> Result<Vec<StatusCheckRecord>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT id, monitor_uuid, status, latency_ms, error_message, checked_at \
                 FROM status_checks WHERE monitor_uuid = ? \
                 ORDER BY checked_at DESC LIMIT ?",
            )
            .await?;

        let mut rows = stmt.query(params![uuid.to_string(), limit as i64]).await?;
        let mut checks = Vec::new();

        while let Some(row) = rows.next().await? {
            checks.push(check_from_row(&row)?);
        }

        Ok(checks)
    }

    async fn check_stats(&self, uuid: Uuid, window_hours: u32) -> Result<CheckStats> {
        let conn = self.get_conn().await?;
        let cutoff = chrono::Utc::now() - chrono::Duration::hours(window_hours as i64);

        let mut rows = conn
            .query(
                "SELECT COUNT(*), \
                 SUM(CASE WHEN status = 'up' THEN 1 ELSE 0 END), \
                 AVG(CASE WHEN status = 'up' THEN latency_ms END), \
                 MIN(CASE WHEN status = 'up' THEN latency_ms END), \
                 MAX(CASE WHEN status = 'up' THEN latency_ms END) \
                 FROM status_checks WHERE monitor_uuid = ? AND checked_at >= ?",
                params![uuid.to_string(), cutoff.timestamp_millis()],
            )
            .await?;

        let row = match rows.next().await? {
            Some(row) => row,
            None => return Ok(CheckStats::empty()),
        };

        let total_checks = row.get::<i64>(0)? as u64;
        if total_checks == 0 {
            // Guard against dividing by zero on an empty window.
            return Ok(CheckStats::empty());
        }

        let up_checks = row.get::<Option<i64>>(1)?.unwrap_or(0) as u64;

        Ok(CheckStats {
            total_checks,
            up_checks,
            down_checks: total_checks - up_checks,
            uptime_percentage: up_checks as f64 / total_checks as f64 * 100.0,
            avg_latency_ms: row.get::<Option<f64>>(2)?,
            min_latency_ms: row.get::<Option<i64>>(3)?.map(|v| v as u64),
            max_latency_ms: row.get::<Option<i64>>(4)?.map(|v| v as u64),
        })
    }

    async fn record_notification(&self, entry: &NotificationLogEntry) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO notification_log (monitor_uuid, recipient, kind, success, error, \
             sent_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.monitor_uuid.to_string(),
                entry.recipient.clone(),
                entry.kind.to_string(),
                if entry.success { 1 } else { 0 },
                entry.error.clone(),
                timestamp_to_millis(entry.sent_at)
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn notification_log(
        &self,
        uuid: Uuid,
        limit: usize,
    ) -> Result<Vec<NotificationLogEntry>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT id, monitor_uuid, recipient, kind, success, error, sent_at \
                 FROM notification_log WHERE monitor_uuid = ? \
                 ORDER BY sent_at DESC LIMIT ?",
            )
            .await?;

        let mut rows = stmt.query(params![uuid.to_string(), limit as i64]).await?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next().await? {
            let monitor_uuid_str: String = row.get(1)?;
            let kind_str: String = row.get(3)?;

            entries.push(NotificationLogEntry {
                id: Some(row.get(0)?),
                monitor_uuid: Uuid::parse_str(&monitor_uuid_str)?,
                recipient: row.get(2)?,
                kind: match kind_str.as_str() {
                    "up" => NotificationKind::Up,
                    _ => NotificationKind::Down,
                },
                success: row.get::<i64>(4)? != 0,
                error: row.get::<Option<String>>(5)?,
                sent_at: millis_to_timestamp(row.get(6)?),
            });
        }

        Ok(entries)
    }
}
