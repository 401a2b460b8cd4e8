#![allow(dead_code)]
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::monitoring::types::{MonitorStatus, NotificationKind, ProbeOutcome};

/// Convert SystemTime to unix milliseconds for storage.
///
/// Milliseconds rather than seconds: downtime durations are computed from
/// stored check timestamps and need sub-second resolution.
pub fn timestamp_to_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

/// Convert unix milliseconds back to SystemTime.
pub fn millis_to_timestamp(millis: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis.max(0) as u64)
}

/// Monitor owner. Authentication lives outside this crate; the engine only
/// needs the contact address for notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub email: String,
    pub created_at: SystemTime,
}

impl User {
    pub fn new(email: String) -> Self {
        Self { id: None, uuid: Uuid::new_v4(), email, created_at: SystemTime::now() }
    }
}

/// Monitor model - a user-registered URL under periodic observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub url: String,
    pub name: Option<String>,
    pub status: MonitorStatus,
    pub last_checked_at: Option<SystemTime>,
    pub last_latency_ms: Option<u64>,
    pub notifications_enabled: bool,
    pub last_notified_at: Option<SystemTime>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Monitor {
    /// Create a new monitor in the `pending` state.
    pub fn new(user_uuid: Uuid, url: String, name: Option<String>) -> Self {
        let now = SystemTime::now();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            user_uuid,
            url,
            name,
            status: MonitorStatus::Pending,
            last_checked_at: None,
            last_latency_ms: None,
            notifications_enabled: true,
            last_notified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

}

/// A monitor joined with its owner's contact address, as loaded for a sweep.
#[derive(Debug, Clone)]
pub struct MonitorWithOwner {
    pub monitor: Monitor,
    pub owner_email: String,
}

/// StatusCheckRecord model - one append-only history entry per check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCheckRecord {
    pub id: Option<i64>,
    pub monitor_uuid: Uuid,
    pub status: MonitorStatus,
    pub latency_ms: Option<u64>,
    pub error_message: Option<String>,
    pub checked_at: SystemTime,
}

impl StatusCheckRecord {
    /// Build a history entry from a probe outcome.
    pub fn from_outcome(monitor_uuid: Uuid, outcome: &ProbeOutcome, checked_at: SystemTime) -> Self {
        Self {
            id: None,
            monitor_uuid,
            status: outcome.status,
            latency_ms: outcome.latency_ms,
            error_message: outcome.error_detail.clone(),
            checked_at,
        }
    }
}

/// NotificationLogEntry model - append-only record of a delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    pub id: Option<i64>,
    pub monitor_uuid: Uuid,
    pub recipient: String,
    pub kind: NotificationKind,
    pub success: bool,
    pub error: Option<String>,
    pub sent_at: SystemTime,
}

/// Aggregate check statistics over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckStats {
    pub total_checks: u64,
    pub up_checks: u64,
    pub down_checks: u64,
    /// `up_checks / total_checks * 100`; 0 when the window holds no checks
    pub uptime_percentage: f64,
    /// Latency aggregates over successful checks only
    pub avg_latency_ms: Option<f64>,
    pub min_latency_ms: Option<u64>,
    pub max_latency_ms: Option<u64>,
}

impl CheckStats {
    pub fn empty() -> Self {
        Self {
            total_checks: 0,
            up_checks: 0,
            down_checks: 0,
            uptime_percentage: 0.0,
            avg_latency_ms: None,
            min_latency_ms: None,
            max_latency_ms: None,
        }
    }
}
