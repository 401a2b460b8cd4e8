/// End-to-end tests for the monitoring engine
///
/// These drive the full pipeline (probe -> history -> transition ->
/// notification) over a temporary libsql store, with the prober and the
/// notifier replaced by scripted test doubles at their trait seams.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{Result, anyhow};
use tempfile::{TempDir, tempdir};
use uuid::Uuid;

use super::executor::CheckExecutor;
use super::prober::Prober;
use super::scheduler::Scheduler;
use super::types::{MonitorStatus, NotificationKind, ProbeOutcome};
use crate::database::models::{Monitor, StatusCheckRecord, User};
use crate::database::{Database, LibsqlStore};
use crate::notifier::Notifier;
use crate::pool::LibsqlManager;

/// Helper to create a store over a temporary database
async fn create_test_store() -> Result<(Arc<LibsqlStore>, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");

    let db = libsql::Builder::new_local(db_path.to_string_lossy().as_ref()).build().await?;
    let pool: crate::pool::LibsqlPool =
        deadpool::managed::Pool::builder(LibsqlManager::new(db)).build()?;

    {
        let conn = pool.get().await?;
        crate::database::initialize_database(&conn).await?;
    }

    Ok((Arc::new(LibsqlStore::new_from_pool(pool)), temp_dir))
}

/// Helper to create an owner and one of their monitors
async fn seed_monitor(
    store: &Arc<LibsqlStore>,
    url: &str,
    notifications_enabled: bool,
) -> Result<Monitor> {
    let user = User::new("owner@example.com".to_string());
    store.save_user(&user).await?;

    let mut monitor = Monitor::new(user.uuid, url.to_string(), Some("Example".to_string()));
    monitor.notifications_enabled = notifications_enabled;
    store.save_monitor(&monitor).await?;

    Ok(monitor)
}

/// Prober returning a scripted sequence of outcomes, then `up`
struct ScriptedProber {
    outcomes: Mutex<VecDeque<ProbeOutcome>>,
}

impl ScriptedProber {
    fn new(outcomes: Vec<ProbeOutcome>) -> Self {
        Self { outcomes: Mutex::new(outcomes.into()) }
    }
}

#[async_trait::async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _url: &str) -> ProbeOutcome {
        self.outcomes.lock().unwrap().pop_front().unwrap_or_else(|| ProbeOutcome::up(10))
    }
}

#[derive(Debug, Clone)]
struct SentAlert {
    kind: NotificationKind,
    recipient: String,
    url: String,
    downtime: Option<String>,
}

/// Notifier recording every delivery attempt; optionally failing all sends
struct RecordingNotifier {
    sent: Mutex<Vec<SentAlert>>,
    fail_sends: bool,
}

impl RecordingNotifier {
    fn new(fail_sends: bool) -> Self {
        Self { sent: Mutex::new(Vec::new()), fail_sends }
    }

    fn record(&self, alert: SentAlert) -> Result<String> {
        if self.fail_sends {
            return Err(anyhow!("smtp relay unavailable"));
        }
        self.sent.lock().unwrap().push(alert);
        Ok(Uuid::new_v4().to_string())
    }

    fn sent(&self) -> Vec<SentAlert> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_down_alert(
        &self,
        recipient: &str,
        url: &str,
        _name: Option<&str>,
    ) -> Result<String> {
        self.record(SentAlert {
            kind: NotificationKind::Down,
            recipient: recipient.to_string(),
            url: url.to_string(),
            downtime: None,
        })
    }

    async fn send_up_alert(
        &self,
        recipient: &str,
        url: &str,
        _name: Option<&str>,
        downtime: Option<&str>,
    ) -> Result<String> {
        self.record(SentAlert {
            kind: NotificationKind::Up,
            recipient: recipient.to_string(),
            url: url.to_string(),
            downtime: downtime.map(str::to_string),
        })
    }
}

/// Wire a scheduler over the test store with scripted probes. The interval is
/// far longer than any test, so sweeps only run when driven explicitly.
fn build_engine(
    store: Arc<LibsqlStore>,
    outcomes: Vec<ProbeOutcome>,
    fail_sends: bool,
) -> (Arc<Scheduler>, Arc<RecordingNotifier>) {
    let prober = Arc::new(ScriptedProber::new(outcomes));
    let notifier = Arc::new(RecordingNotifier::new(fail_sends));

    let dyn_store: Arc<dyn Database> = store;
    let executor = Arc::new(CheckExecutor::new(
        Arc::clone(&dyn_store),
        prober,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    ));
    let scheduler =
        Arc::new(Scheduler::new(executor, dyn_store, Duration::from_secs(3600), Duration::ZERO));

    (scheduler, notifier)
}

#[tokio::test]
async fn test_each_sweep_appends_one_history_record() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", true).await?;
    let (scheduler, _notifier) = build_engine(Arc::clone(&store), Vec::new(), false);

    for _ in 0..3 {
        scheduler.run_sweep().await;
    }

    let checks = store.recent_checks(monitor.uuid, 10).await?;
    assert_eq!(checks.len(), 3);
    assert!(checks.iter().all(|c| c.status == MonitorStatus::Up));

    let current = store.get_monitor(monitor.uuid).await?.expect("monitor exists");
    assert_eq!(current.status, MonitorStatus::Up);
    assert!(current.last_checked_at.is_some());
    assert_eq!(current.last_latency_ms, Some(10));

    Ok(())
}

#[tokio::test]
async fn test_stats_with_empty_window_has_zero_uptime() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", true).await?;

    let stats = store.check_stats(monitor.uuid, 24).await?;
    assert_eq!(stats.total_checks, 0);
    assert_eq!(stats.uptime_percentage, 0.0);
    assert_eq!(stats.avg_latency_ms, None);

    Ok(())
}

#[tokio::test]
async fn test_stats_aggregates_over_trailing_window() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", true).await?;
    let now = SystemTime::now();

    for record in [
        StatusCheckRecord::from_outcome(monitor.uuid, &ProbeOutcome::up(100), now),
        StatusCheckRecord::from_outcome(monitor.uuid, &ProbeOutcome::up(200), now),
        StatusCheckRecord::from_outcome(
            monitor.uuid,
            &ProbeOutcome::down(None, "connection refused"),
            now,
        ),
        // Outside the 24h window, must not be counted.
        StatusCheckRecord::from_outcome(
            monitor.uuid,
            &ProbeOutcome::up(999),
            now - Duration::from_secs(25 * 3600),
        ),
    ] {
        store.record_status_check(&record).await?;
    }

    let stats = store.check_stats(monitor.uuid, 24).await?;
    assert_eq!(stats.total_checks, 3);
    assert_eq!(stats.up_checks, 2);
    assert_eq!(stats.down_checks, 1);
    assert!((stats.uptime_percentage - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats.avg_latency_ms, Some(150.0));
    assert_eq!(stats.min_latency_ms, Some(100));
    assert_eq!(stats.max_latency_ms, Some(200));

    Ok(())
}

#[tokio::test]
async fn test_outage_and_recovery_notify_exactly_once_each() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", true).await?;
    let (scheduler, notifier) = build_engine(
        Arc::clone(&store),
        vec![
            ProbeOutcome::up(25),
            ProbeOutcome::down(None, "connection refused"),
            ProbeOutcome::up(30),
        ],
        false,
    );

    // pending -> up -> down -> up; sleeps keep the check timestamps distinct.
    for _ in 0..3 {
        scheduler.run_sweep().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].kind, NotificationKind::Down);
    assert_eq!(sent[0].recipient, "owner@example.com");
    assert_eq!(sent[1].kind, NotificationKind::Up);
    let downtime = sent[1].downtime.as_deref().expect("recovery alert carries a duration");
    assert!(!downtime.is_empty());

    let log = store.notification_log(monitor.uuid, 10).await?;
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|entry| entry.success && entry.error.is_none()));

    let current = store.get_monitor(monitor.uuid).await?.expect("monitor exists");
    assert_eq!(current.status, MonitorStatus::Up);
    assert!(current.last_notified_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_disabled_notifications_never_produce_log_entries() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", false).await?;
    let (scheduler, notifier) = build_engine(
        Arc::clone(&store),
        vec![
            ProbeOutcome::up(25),
            ProbeOutcome::down(None, "connection refused"),
            ProbeOutcome::up(30),
        ],
        false,
    );

    for _ in 0..3 {
        scheduler.run_sweep().await;
    }

    assert!(notifier.sent().is_empty());
    assert!(store.notification_log(monitor.uuid, 10).await?.is_empty());

    // History is still recorded and the cached status still moves.
    assert_eq!(store.recent_checks(monitor.uuid, 10).await?.len(), 3);
    let current = store.get_monitor(monitor.uuid).await?.expect("monitor exists");
    assert_eq!(current.status, MonitorStatus::Up);
    assert_eq!(current.last_notified_at, None);

    Ok(())
}

#[tokio::test]
async fn test_steady_up_observations_never_notify() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", true).await?;
    let (scheduler, notifier) = build_engine(Arc::clone(&store), Vec::new(), false);

    for _ in 0..4 {
        scheduler.run_sweep().await;
    }

    assert!(notifier.sent().is_empty());
    assert!(store.notification_log(monitor.uuid, 10).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_sends_are_logged_and_sweep_continues() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let first = seed_monitor(&store, "https://one.example.com", true).await?;
    let second = seed_monitor(&store, "https://two.example.com", true).await?;

    // Sweep 1: both up. Sweep 2: both down, every send failing.
    let (scheduler, notifier) = build_engine(
        Arc::clone(&store),
        vec![
            ProbeOutcome::up(25),
            ProbeOutcome::up(25),
            ProbeOutcome::down(None, "connection refused"),
            ProbeOutcome::down(None, "connection refused"),
        ],
        true,
    );

    scheduler.run_sweep().await;
    scheduler.run_sweep().await;

    assert!(notifier.sent().is_empty());

    for monitor in [&first, &second] {
        // The failed attempt is logged and the sweep still checked the rest.
        assert_eq!(store.recent_checks(monitor.uuid, 10).await?.len(), 2);

        let log = store.notification_log(monitor.uuid, 10).await?;
        assert_eq!(log.len(), 1);
        assert!(!log[0].success);
        assert!(log[0].error.as_deref().unwrap_or_default().contains("smtp relay unavailable"));

        let current = store.get_monitor(monitor.uuid).await?.expect("monitor exists");
        assert_eq!(current.last_notified_at, None);
    }

    Ok(())
}

#[tokio::test]
async fn test_scheduler_start_sweeps_immediately_and_is_idempotent() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", true).await?;
    let (scheduler, _notifier) = build_engine(Arc::clone(&store), Vec::new(), false);

    scheduler.start();
    assert!(scheduler.is_running());
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The interval is an hour, so exactly the immediate sweep has run.
    assert_eq!(store.recent_checks(monitor.uuid, 10).await?.len(), 1);

    // Starting again while running is a no-op.
    scheduler.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.recent_checks(monitor.uuid, 10).await?.len(), 1);

    scheduler.stop();
    assert!(!scheduler.is_running());
    scheduler.stop(); // also a no-op

    Ok(())
}

#[tokio::test]
async fn test_check_monitor_now_gives_initial_status() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", true).await?;
    let (scheduler, notifier) = build_engine(Arc::clone(&store), Vec::new(), false);

    assert_eq!(
        store.get_monitor(monitor.uuid).await?.expect("monitor exists").status,
        MonitorStatus::Pending
    );

    scheduler.check_monitor_now(monitor.uuid).await?;

    let current = store.get_monitor(monitor.uuid).await?.expect("monitor exists");
    assert_eq!(current.status, MonitorStatus::Up);
    assert_eq!(store.recent_checks(monitor.uuid, 10).await?.len(), 1);

    // First observation establishes the baseline without notifying.
    assert!(notifier.sent().is_empty());

    // Unknown monitors are an error for the caller.
    assert!(scheduler.check_monitor_now(Uuid::new_v4()).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_delete_monitor_removes_history_and_log() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", true).await?;
    let (scheduler, _notifier) = build_engine(
        Arc::clone(&store),
        vec![ProbeOutcome::up(25), ProbeOutcome::down(None, "connection refused")],
        false,
    );

    scheduler.run_sweep().await;
    scheduler.run_sweep().await;
    assert_eq!(store.recent_checks(monitor.uuid, 10).await?.len(), 2);

    store.delete_monitor(monitor.uuid).await?;

    assert!(store.get_monitor(monitor.uuid).await?.is_none());
    assert!(store.recent_checks(monitor.uuid, 10).await?.is_empty());
    assert!(store.notification_log(monitor.uuid, 10).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_monitor_with_owner_joins_contact_address() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let monitor = seed_monitor(&store, "https://example.com", true).await?;

    let entry = store.monitor_with_owner(monitor.uuid).await?.expect("monitor exists");
    assert_eq!(entry.owner_email, "owner@example.com");
    assert_eq!(entry.monitor.uuid, monitor.uuid);

    let all = store.monitors_with_owner().await?;
    assert_eq!(all.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_save_monitor_rejects_invalid_targets() -> Result<()> {
    let (store, _dir) = create_test_store().await?;
    let user = User::new("owner@example.com".to_string());
    store.save_user(&user).await?;

    let empty = Monitor::new(user.uuid, "".to_string(), None);
    assert!(store.save_monitor(&empty).await.is_err());

    let bad_scheme = Monitor::new(user.uuid, "ftp://example.com".to_string(), None);
    assert!(store.save_monitor(&bad_scheme).await.is_err());

    // A bare host is valid; the prober defaults the scheme.
    let bare = Monitor::new(user.uuid, "example.com".to_string(), None);
    assert!(store.save_monitor(&bare).await.is_ok());

    Ok(())
}
