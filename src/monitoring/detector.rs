//! Status transition detection.
//!
//! The state machine is a pure function over (current, observed) so the
//! notification policy stays testable without a store or a notifier.

use std::time::Duration;

use super::types::{MonitorStatus, NotificationKind};

/// Outcome of applying one probe classification to a monitor's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The state the monitor moves to
    pub next: MonitorStatus,
    /// Notification owed by this transition, if any
    pub notification: Option<NotificationKind>,
}

/// Compute the next state and whether a notification is owed.
///
/// The first observation after `Pending` establishes the baseline and never
/// notifies; only `Up -> Down` and `Down -> Up` owe a notification.
pub fn next_state(current: MonitorStatus, observed: MonitorStatus) -> Transition {
    match (current, observed) {
        (MonitorStatus::Up, MonitorStatus::Down) => {
            Transition { next: MonitorStatus::Down, notification: Some(NotificationKind::Down) }
        }
        (MonitorStatus::Down, MonitorStatus::Up) => {
            Transition { next: MonitorStatus::Up, notification: Some(NotificationKind::Up) }
        }
        (_, observed) => Transition { next: observed, notification: None },
    }
}

/// Render a downtime duration as the largest two non-zero units among
/// days, hours, minutes and seconds, pluralized per count.
pub fn format_downtime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let units = [
        (total_seconds / 86_400, "day"),
        (total_seconds % 86_400 / 3_600, "hour"),
        (total_seconds % 3_600 / 60, "minute"),
        (total_seconds % 60, "second"),
    ];

    let parts: Vec<String> = units
        .iter()
        .filter(|(count, _)| *count > 0)
        .take(2)
        .map(|(count, unit)| {
            if *count == 1 { format!("1 {unit}") } else { format!("{count} {unit}s") }
        })
        .collect();

    if parts.is_empty() { "0 seconds".to_string() } else { parts.join(" ") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_establishes_baseline() {
        let up = next_state(MonitorStatus::Pending, MonitorStatus::Up);
        assert_eq!(up.next, MonitorStatus::Up);
        assert_eq!(up.notification, None);

        let down = next_state(MonitorStatus::Pending, MonitorStatus::Down);
        assert_eq!(down.next, MonitorStatus::Down);
        assert_eq!(down.notification, None);
    }

    #[test]
    fn test_outage_owes_down_notification() {
        let t = next_state(MonitorStatus::Up, MonitorStatus::Down);
        assert_eq!(t.next, MonitorStatus::Down);
        assert_eq!(t.notification, Some(NotificationKind::Down));
    }

    #[test]
    fn test_recovery_owes_up_notification() {
        let t = next_state(MonitorStatus::Down, MonitorStatus::Up);
        assert_eq!(t.next, MonitorStatus::Up);
        assert_eq!(t.notification, Some(NotificationKind::Up));
    }

    #[test]
    fn test_steady_state_never_notifies() {
        assert_eq!(next_state(MonitorStatus::Up, MonitorStatus::Up).notification, None);
        assert_eq!(next_state(MonitorStatus::Down, MonitorStatus::Down).notification, None);
    }

    #[test]
    fn test_format_downtime_two_largest_units() {
        assert_eq!(format_downtime(Duration::from_millis(7_300_000)), "2 hours 1 minute");
        assert_eq!(format_downtime(Duration::from_millis(45_000)), "45 seconds");
        assert_eq!(format_downtime(Duration::from_millis(90_000_000)), "1 day 1 hour");
    }

    #[test]
    fn test_format_downtime_skips_zero_middle_units() {
        // 1 day, 0 hours, 5 minutes
        assert_eq!(format_downtime(Duration::from_secs(86_400 + 300)), "1 day 5 minutes");
    }

    #[test]
    fn test_format_downtime_pluralization() {
        assert_eq!(format_downtime(Duration::from_secs(1)), "1 second");
        assert_eq!(format_downtime(Duration::from_secs(61)), "1 minute 1 second");
        assert_eq!(format_downtime(Duration::from_secs(120)), "2 minutes");
    }

    #[test]
    fn test_format_downtime_zero() {
        assert_eq!(format_downtime(Duration::from_millis(250)), "0 seconds");
    }
}
