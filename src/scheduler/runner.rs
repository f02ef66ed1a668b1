//! Reminder scheduler background loop.
//!
//! Spawns a tokio task that wakes on a coarse interval. The first wake at or
//! after the configured hour on a new calendar day runs the daily check:
//! query active reminders for today's weekday and dispatch one notification
//! each. A check that reached the dispatch stage marks the day as done even
//! when some dispatches failed; a failed store query leaves the day open so
//! the next wake retries.

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::notify::Dispatcher;
use crate::records::{Weekday, reminders_for_day};
use crate::scheduler::clock::{Clock, SystemClock};
use crate::scheduler::ledger::{DispatchLedger, dispatch_key};
use crate::store::RecordStore;
use chrono::{Datelike, NaiveDate, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Why a wake did not run a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Today's check already ran.
    AlreadyChecked(NaiveDate),
    /// The local hour is before the check hour.
    TooEarly { hour: u32, check_hour: u32 },
}

/// One failed reminder dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDispatch {
    pub reminder_id: String,
    pub recipient: String,
    pub diagnostic: String,
}

/// Summary of a completed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub date: NaiveDate,
    pub weekday: Weekday,
    /// Reminders returned by the store for today.
    pub matched: usize,
    pub sent: usize,
    pub failed: Vec<FailedDispatch>,
    /// Reminders skipped because the ledger already has them for today.
    pub already_sent: usize,
    /// Records that could not be decoded into reminders.
    pub malformed: usize,
}

/// Result of one wake cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeOutcome {
    Skipped(SkipReason),
    Checked(CheckReport),
    /// The check could not query the store; the day stays open.
    Aborted { error: String },
}

/// Format the reminder notification as `(subject, html body)`.
#[must_use]
pub fn reminder_notification(organization: &str, message: &str, day: Weekday) -> (String, String) {
    (
        format!("🔔 Rappel {organization} : {message}"),
        format!("<p>C'est {day}, pense à : <b>{message}</b></p>"),
    )
}

/// Background scheduler for weekly reminders.
pub struct ReminderScheduler {
    store: Arc<dyn RecordStore>,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    organization: String,
    check_hour: u32,
    wake_interval: Duration,
    /// Date of the last completed check.
    last_checked: Option<NaiveDate>,
    ledger: Option<DispatchLedger>,
}

impl ReminderScheduler {
    /// Create a scheduler using the system clock and no ledger.
    pub fn new(
        store: Arc<dyn RecordStore>,
        dispatcher: Arc<dyn Dispatcher>,
        config: &SchedulerConfig,
        organization: impl Into<String>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock: Arc::new(SystemClock),
            organization: organization.into(),
            check_hour: config.check_hour,
            wake_interval: Duration::from_secs(config.wake_interval_secs.max(1)),
            last_checked: None,
            ledger: None,
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable the per-reminder-per-day dispatch ledger.
    #[must_use]
    pub fn with_ledger(mut self, ledger: DispatchLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Date of the last completed check, if any.
    #[must_use]
    pub fn last_checked(&self) -> Option<NaiveDate> {
        self.last_checked
    }

    /// Run one wake cycle.
    pub async fn wake(&mut self) -> WakeOutcome {
        let now = self.clock.now();
        let today = now.date();

        if self.last_checked == Some(today) {
            debug!("reminder check for {today} already done");
            return WakeOutcome::Skipped(SkipReason::AlreadyChecked(today));
        }
        if now.hour() < self.check_hour {
            debug!(
                "reminder check waits for {:02}:00 (now {:02}h)",
                self.check_hour,
                now.hour()
            );
            return WakeOutcome::Skipped(SkipReason::TooEarly {
                hour: now.hour(),
                check_hour: self.check_hour,
            });
        }

        let weekday = Weekday::from(today.weekday());
        info!("running reminder check for {today} ({weekday})");
        match self.check(today, weekday).await {
            Ok(report) => {
                self.last_checked = Some(today);
                info!(
                    "reminder check done: {} matched, {} sent, {} failed, {} already sent",
                    report.matched,
                    report.sent,
                    report.failed.len(),
                    report.already_sent
                );
                WakeOutcome::Checked(report)
            }
            Err(e) => {
                error!("reminder check aborted, will retry next wake: {e}");
                WakeOutcome::Aborted {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn check(&mut self, today: NaiveDate, weekday: Weekday) -> Result<CheckReport> {
        let batch = reminders_for_day(self.store.as_ref(), weekday).await?;
        for bad in &batch.malformed {
            warn!("skipping malformed reminder: {bad}");
        }

        if let Some(ledger) = self.ledger.as_mut() {
            if let Err(e) = ledger.refresh_for(today) {
                warn!("dispatch ledger refresh failed, continuing: {e}");
            }
        }

        let mut report = CheckReport {
            date: today,
            weekday,
            matched: batch.reminders.len(),
            sent: 0,
            failed: Vec::new(),
            already_sent: 0,
            malformed: batch.malformed.len(),
        };

        for reminder in batch.reminders {
            // Only active reminders for today are dispatched, whatever the store returned.
            if !reminder.active || reminder.day != weekday {
                warn!("store returned non-matching reminder {}", reminder.id);
                report.matched = report.matched.saturating_sub(1);
                continue;
            }

            let key = dispatch_key(&reminder.id, today);
            if self.ledger.as_ref().is_some_and(|l| l.contains(&key)) {
                debug!("reminder {} already sent today", reminder.id);
                report.already_sent += 1;
                continue;
            }

            let (subject, body) =
                reminder_notification(&self.organization, &reminder.message, weekday);
            let outcome = self
                .dispatcher
                .send(&subject, &body, &reminder.recipient)
                .await;

            if outcome.success {
                info!("reminder sent to {}", reminder.recipient);
                report.sent += 1;
                if let Some(ledger) = self.ledger.as_mut() {
                    if let Err(e) = ledger.record(&key) {
                        warn!("cannot record dispatch of {}: {e}", reminder.id);
                    }
                }
            } else {
                warn!(
                    "reminder to {} failed: {}",
                    reminder.recipient, outcome.diagnostic
                );
                report.failed.push(FailedDispatch {
                    reminder_id: reminder.id.clone(),
                    recipient: reminder.recipient.clone(),
                    diagnostic: outcome.diagnostic,
                });
            }
        }

        Ok(report)
    }

    /// Start the background loop.
    ///
    /// Prefer [`crate::scheduler::SchedulerLatch::start`], which guarantees a
    /// single loop per latch.
    pub fn run(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "reminder scheduler started (wake every {}s, check from {:02}:00)",
                self.wake_interval.as_secs(),
                self.check_hour
            );
            let mut interval = tokio::time::interval(self.wake_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let _ = self.wake().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::notify::DispatchReport;
    use crate::records::{Reminder, add_reminder};
    use crate::scheduler::clock::FixedClock;
    use crate::store::{Collection, MemoryStore};
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::sync::Mutex;

    /// Records every send; fails for recipients listed in `reject`.
    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<(String, String, String)>>,
        reject: Vec<String>,
    }

    impl RecordingDispatcher {
        fn rejecting(recipient: &str) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                reject: vec![recipient.to_owned()],
            }
        }

        fn calls(&self) -> Vec<(String, String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn send(&self, subject: &str, body: &str, recipient: &str) -> DispatchReport {
            self.sent.lock().unwrap().push((
                subject.to_owned(),
                body.to_owned(),
                recipient.to_owned(),
            ));
            if self.reject.iter().any(|r| r == recipient) {
                DispatchReport::failed("rejected")
            } else {
                DispatchReport::sent("ok")
            }
        }
    }

    /// Monday 2026-10-19.
    fn monday_at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(hour, 5, 0)
            .unwrap()
    }

    struct Harness {
        store: Arc<MemoryStore>,
        dispatcher: Arc<RecordingDispatcher>,
        clock: Arc<FixedClock>,
        scheduler: ReminderScheduler,
    }

    fn harness(dispatcher: RecordingDispatcher) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(dispatcher);
        let clock = Arc::new(FixedClock::new(monday_at(10)));
        let scheduler = ReminderScheduler::new(
            store.clone(),
            dispatcher.clone(),
            &SchedulerConfig::default(),
            "Cor-Tech",
        )
        .with_clock(clock.clone());
        Harness {
            store,
            dispatcher,
            clock,
            scheduler,
        }
    }

    async fn seed(store: &MemoryStore, message: &str, to: &str, day: Weekday, active: bool) {
        let mut reminder = Reminder::new(message, to, day);
        reminder.active = active;
        store
            .create(Collection::Reminders, reminder.to_fields())
            .await
            .unwrap();
    }

    #[test]
    fn notification_embeds_message_and_day() {
        let (subject, body) = reminder_notification("Cor-Tech", "Sortir les bacs", Weekday::Monday);
        assert_eq!(subject, "🔔 Rappel Cor-Tech : Sortir les bacs");
        assert!(body.contains("Lundi"));
        assert!(body.contains("<b>Sortir les bacs</b>"));
    }

    #[tokio::test]
    async fn only_active_reminders_for_today_are_dispatched() {
        let mut h = harness(RecordingDispatcher::default());
        seed(&h.store, "today", "a@x.fr", Weekday::Monday, true).await;
        seed(&h.store, "inactive", "b@x.fr", Weekday::Monday, false).await;
        seed(&h.store, "tomorrow", "c@x.fr", Weekday::Tuesday, true).await;

        let report = match h.scheduler.wake().await {
            WakeOutcome::Checked(report) => report,
            other => panic!("expected a check, got {other:?}"),
        };
        assert_eq!(report.weekday, Weekday::Monday);
        assert_eq!(report.matched, 1);
        assert_eq!(report.sent, 1);
        let calls = h.dispatcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2, "a@x.fr");
        assert!(calls[0].0.contains("today"));
    }

    #[tokio::test]
    async fn same_day_wakes_do_not_dispatch_twice() {
        let mut h = harness(RecordingDispatcher::default());
        seed(&h.store, "bacs", "a@x.fr", Weekday::Monday, true).await;

        assert!(matches!(h.scheduler.wake().await, WakeOutcome::Checked(_)));
        for hour in [10, 11, 15, 23] {
            h.clock.set(monday_at(hour));
            assert_eq!(
                h.scheduler.wake().await,
                WakeOutcome::Skipped(SkipReason::AlreadyChecked(monday_at(0).date()))
            );
        }
        assert_eq!(h.dispatcher.calls().len(), 1);
        assert_eq!(h.store.query_count(), 1);
    }

    #[tokio::test]
    async fn wake_before_check_hour_is_skipped() {
        let mut h = harness(RecordingDispatcher::default());
        seed(&h.store, "bacs", "a@x.fr", Weekday::Monday, true).await;
        h.clock.set(monday_at(8));

        assert_eq!(
            h.scheduler.wake().await,
            WakeOutcome::Skipped(SkipReason::TooEarly {
                hour: 8,
                check_hour: 9
            })
        );
        assert!(h.dispatcher.calls().is_empty());
        assert!(h.scheduler.last_checked().is_none());

        h.clock.set(monday_at(9));
        assert!(matches!(h.scheduler.wake().await, WakeOutcome::Checked(_)));
    }

    #[tokio::test]
    async fn query_failure_keeps_day_open_for_retry() {
        let mut h = harness(RecordingDispatcher::default());
        seed(&h.store, "bacs", "a@x.fr", Weekday::Monday, true).await;
        h.store.set_unreachable(true);

        let outcome = h.scheduler.wake().await;
        assert!(matches!(outcome, WakeOutcome::Aborted { .. }), "{outcome:?}");
        assert!(h.scheduler.last_checked().is_none());
        assert!(h.dispatcher.calls().is_empty());

        h.store.set_unreachable(false);
        h.clock.set(monday_at(11));
        assert!(matches!(h.scheduler.wake().await, WakeOutcome::Checked(_)));
        assert_eq!(h.dispatcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn one_failed_dispatch_does_not_stop_the_rest() {
        let mut h = harness(RecordingDispatcher::rejecting("bad@x.fr"));
        seed(&h.store, "one", "bad@x.fr", Weekday::Monday, true).await;
        seed(&h.store, "two", "good@x.fr", Weekday::Monday, true).await;

        let WakeOutcome::Checked(report) = h.scheduler.wake().await else {
            panic!("expected a check");
        };
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].recipient, "bad@x.fr");
        assert_eq!(h.dispatcher.calls().len(), 2);
        // Partial failure still completes the day.
        assert_eq!(h.scheduler.last_checked(), Some(monday_at(0).date()));
    }

    #[tokio::test]
    async fn next_day_runs_a_new_check() {
        let mut h = harness(RecordingDispatcher::default());
        seed(&h.store, "lundi", "a@x.fr", Weekday::Monday, true).await;
        seed(&h.store, "mardi", "b@x.fr", Weekday::Tuesday, true).await;

        h.scheduler.wake().await;
        h.clock.set(monday_at(10) + chrono::Duration::days(1));
        let WakeOutcome::Checked(report) = h.scheduler.wake().await else {
            panic!("expected tuesday check");
        };
        assert_eq!(report.weekday, Weekday::Tuesday);
        let recipients: Vec<String> = h.dispatcher.calls().into_iter().map(|c| c.2).collect();
        assert_eq!(recipients, vec!["a@x.fr", "b@x.fr"]);
    }

    #[tokio::test]
    async fn malformed_records_are_counted_and_skipped() {
        let mut h = harness(RecordingDispatcher::default());
        seed(&h.store, "ok", "a@x.fr", Weekday::Monday, true).await;
        let mut broken = Reminder::new("", "b@x.fr", Weekday::Monday).to_fields();
        broken.remove(crate::records::reminder_props::MESSAGE);
        h.store
            .create(Collection::Reminders, broken)
            .await
            .unwrap();

        let WakeOutcome::Checked(report) = h.scheduler.wake().await else {
            panic!("expected a check");
        };
        assert_eq!(report.malformed, 1);
        assert_eq!(report.sent, 1);
    }

    #[tokio::test]
    async fn ledger_suppresses_resend_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("dispatch.jsonl");

        let store = Arc::new(MemoryStore::new());
        add_reminder(store.as_ref(), &Reminder::new("bacs", "a@x.fr", Weekday::Monday))
            .await
            .unwrap();
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let clock = Arc::new(FixedClock::new(monday_at(10)));

        for _ in 0..2 {
            // Fresh scheduler = fresh process with no in-memory date.
            let mut scheduler = ReminderScheduler::new(
                store.clone(),
                dispatcher.clone(),
                &SchedulerConfig::default(),
                "Cor-Tech",
            )
            .with_clock(clock.clone())
            .with_ledger(DispatchLedger::open(&ledger_path).unwrap());
            assert!(matches!(scheduler.wake().await, WakeOutcome::Checked(_)));
        }

        assert_eq!(dispatcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn without_ledger_restart_resends() {
        let store = Arc::new(MemoryStore::new());
        add_reminder(store.as_ref(), &Reminder::new("bacs", "a@x.fr", Weekday::Monday))
            .await
            .unwrap();
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let clock = Arc::new(FixedClock::new(monday_at(10)));

        for _ in 0..2 {
            let mut scheduler = ReminderScheduler::new(
                store.clone(),
                dispatcher.clone(),
                &SchedulerConfig::default(),
                "Cor-Tech",
            )
            .with_clock(clock.clone());
            scheduler.wake().await;
        }

        assert_eq!(dispatcher.calls().len(), 2);
    }
}
