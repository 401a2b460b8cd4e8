use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::executor::CheckExecutor;
use crate::database::Database;

enum SchedulerState {
    Stopped,
    Running {
        shutdown: Arc<Notify>,
        task: tokio::task::JoinHandle<()>,
    },
}

/// Owns the repeating sweep timer.
///
/// One sweep checks every registered monitor sequentially with a small
/// inter-check delay. Sweeps never overlap: the shutdown signal and the next
/// timer tick are only observed between sweeps, so stopping the scheduler
/// lets an in-flight sweep run to completion.
pub struct Scheduler {
    executor: Arc<CheckExecutor>,
    store: Arc<dyn Database>,
    interval: Duration,
    check_delay: Duration,
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    pub fn new(
        executor: Arc<CheckExecutor>,
        store: Arc<dyn Database>,
        interval: Duration,
        check_delay: Duration,
    ) -> Self {
        Self { executor, store, interval, check_delay, state: Mutex::new(SchedulerState::Stopped) }
    }

    /// Start the sweep loop. The first sweep runs immediately, then the
    /// timer fires at the configured interval. Starting while already
    /// running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut state = self.state.lock().unwrap();

        if matches!(*state, SchedulerState::Running { .. }) {
            tracing::warn!("scheduler already running, ignoring start");
            return;
        }

        tracing::info!(interval = ?self.interval, "starting monitor scheduler");

        let shutdown = Arc::new(Notify::new());
        let scheduler = Arc::clone(self);
        let signal = Arc::clone(&shutdown);

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(scheduler.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => scheduler.run_sweep().await,
                    _ = signal.notified() => break,
                }
            }

            tracing::info!("monitor scheduler stopped");
        });

        *state = SchedulerState::Running { shutdown, task };
    }

    /// Stop the sweep loop. An in-flight sweep still runs to completion;
    /// stopping while already stopped is a no-op.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();

        match std::mem::replace(&mut *state, SchedulerState::Stopped) {
            SchedulerState::Running { shutdown, task: _task } => {
                tracing::info!("stopping monitor scheduler");
                shutdown.notify_one();
            }
            SchedulerState::Stopped => {
                tracing::warn!("scheduler not running, ignoring stop");
            }
        }
    }

    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock().unwrap(), SchedulerState::Running { .. })
    }

    /// One full pass over all registered monitors.
    ///
    /// A failure while checking one monitor is logged and does not abort the
    /// rest of the sweep.
    pub async fn run_sweep(&self) {
        let monitors = match self.store.monitors_with_owner().await {
            Ok(monitors) => monitors,
            Err(e) => {
                tracing::error!("failed to load monitors for sweep: {e:#}");
                return;
            }
        };

        tracing::debug!("sweeping {} monitors", monitors.len());

        for (i, entry) in monitors.iter().enumerate() {
            // Bound outbound burstiness between consecutive checks.
            if i > 0 {
                tokio::time::sleep(self.check_delay).await;
            }

            if let Err(e) = self.executor.check_monitor(entry).await {
                tracing::error!(
                    monitor = %entry.monitor.uuid,
                    url = %entry.monitor.url,
                    "check failed: {e:#}"
                );
            }
        }
    }

    /// Check a single monitor outside the periodic sweep, so a freshly
    /// created monitor gets an initial status without waiting for the next
    /// tick. Invoked by the CRUD layer on monitor creation.
    #[allow(dead_code)]
    pub async fn check_monitor_now(&self, uuid: Uuid) -> Result<()> {
        let entry = self
            .store
            .monitor_with_owner(uuid)
            .await?
            .ok_or_else(|| anyhow!("monitor {uuid} not found"))?;

        self.executor.check_monitor(&entry).await
    }
}
