//! One-shot start guard for the scheduler loop.

use crate::scheduler::runner::ReminderScheduler;
use std::sync::OnceLock;
use tokio::task::JoinHandle;

/// Starts at most one scheduler loop for its whole lifetime.
///
/// The first successful [`start`](Self::start) memoizes the loop handle;
/// later calls are no-ops and never build a scheduler.
pub struct SchedulerLatch {
    handle: OnceLock<JoinHandle<()>>,
}

impl SchedulerLatch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handle: OnceLock::new(),
        }
    }

    /// Build and spawn the scheduler unless this latch already did.
    ///
    /// Must be called from within a tokio runtime. Returns `true` when this
    /// call started the loop.
    pub fn start<F>(&self, build: F) -> bool
    where
        F: FnOnce() -> ReminderScheduler,
    {
        let mut started = false;
        self.handle.get_or_init(|| {
            started = true;
            build().run()
        });
        if !started {
            tracing::debug!("reminder scheduler already running, start ignored");
        }
        started
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Whether the loop has exited (aborted or panicked).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.get().is_some_and(JoinHandle::is_finished)
    }

    /// Abort the running loop. The latch stays consumed.
    pub fn abort(&self) {
        if let Some(handle) = self.handle.get() {
            handle.abort();
        }
    }
}

impl Default for SchedulerLatch {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_LATCH: SchedulerLatch = SchedulerLatch::new();

/// Start the process-wide reminder scheduler once.
///
/// Safe to call from every session setup path; only the first call spawns.
pub fn start_process_scheduler<F>(build: F) -> bool
where
    F: FnOnce() -> ReminderScheduler,
{
    PROCESS_LATCH.start(build)
}

/// Whether the process-wide scheduler has been started.
#[must_use]
pub fn process_scheduler_started() -> bool {
    PROCESS_LATCH.is_started()
}
