use serde::{Deserialize, Serialize};

/// Classified status of a monitor.
///
/// `Pending` is the state of a monitor that has never been checked; a probe
/// classification is always `Up` or `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Pending,
    Up,
    Down,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Pending => write!(f, "pending"),
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
        }
    }
}

impl MonitorStatus {
    /// Parse the stored text form; unknown values map to `Pending`.
    pub fn from_db(value: &str) -> Self {
        match value {
            "up" => MonitorStatus::Up,
            "down" => MonitorStatus::Down,
            _ => MonitorStatus::Pending,
        }
    }
}

/// Kind of notification owed on a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Down,
    Up,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Down => write!(f, "down"),
            NotificationKind::Up => write!(f, "up"),
        }
    }
}

/// Result of a single probe against a monitor target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Classification of the probe (`Up` or `Down`, never `Pending`)
    pub status: MonitorStatus,

    /// Round-trip latency in milliseconds, when a response was received
    pub latency_ms: Option<u64>,

    /// Failure detail when the probe classified `Down`
    pub error_detail: Option<String>,
}

impl ProbeOutcome {
    /// Successful probe with measured latency
    pub fn up(latency_ms: u64) -> Self {
        Self { status: MonitorStatus::Up, latency_ms: Some(latency_ms), error_detail: None }
    }

    /// Failed probe; latency is present only when a response was received
    pub fn down(latency_ms: Option<u64>, error: impl Into<String>) -> Self {
        Self { status: MonitorStatus::Down, latency_ms, error_detail: Some(error.into()) }
    }
}
