/// Monitoring engine
///
/// This module owns the recurring check loop:
/// - Probing monitor URLs over HTTP
/// - Recording status history
/// - Detecting status transitions and dispatching notifications
/// - Scheduling sweeps over all registered monitors
pub mod detector;
pub mod executor;
pub mod prober;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use executor::CheckExecutor;
pub use prober::{HttpProber, Prober};
pub use scheduler::Scheduler;
pub use types::{MonitorStatus, NotificationKind, ProbeOutcome};

#[cfg(test)]
mod tests;
