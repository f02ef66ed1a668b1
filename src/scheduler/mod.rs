//! Background reminder scheduler.
//!
//! Wakes hourly, runs one check per calendar day from the configured hour,
//! and dispatches a notification for every active reminder of the day.
//! Started once per process through [`SchedulerLatch`].

pub mod clock;
pub mod latch;
pub mod ledger;
pub mod runner;

pub use clock::{Clock, FixedClock, SystemClock};
pub use latch::{SchedulerLatch, process_scheduler_started, start_process_scheduler};
pub use ledger::{DispatchLedger, dispatch_key};
pub use runner::{CheckReport, FailedDispatch, ReminderScheduler, SkipReason, WakeOutcome};
