//! Scheduler loop
//!
//! Periodic tick that walks every owner's records, dispatches whatever is
//! due, and persists the outcome before anything else can run. Ticks are
//! serialized by an internal lock, so an overlapping timer fire or a manual
//! `run_tick` call never races a tick already in flight.
//!
//! - **Version**: 1.4.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.4.0: Cycle rollover writes only when the cycle state actually changes
//! - 1.3.0: Graceful shutdown waits for the in-flight tick
//! - 1.2.0: Recurring cycle rollover via last-occurrence tracking
//! - 1.1.0: Skip the whole tick while the messaging client is not ready
//! - 1.0.0: Initial interval loop

use anyhow::Result;
use chrono::{FixedOffset, NaiveDateTime};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::core::clock::Clock;
use crate::core::reminder::{Reminder, ReminderKind, Target};
use crate::features::delivery::template::TemplateKind;
use crate::features::delivery::Dispatcher;
use crate::features::scheduling::occurrence::{current_occurrence, due_targets};
use crate::messaging::MessagingClient;
use crate::storage::RecordStore;

/// Outcome of one tick, mostly for tests and log lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub dispatched: usize,
    pub failed: usize,
    pub skipped: bool,
}

pub struct ReminderScheduler {
    store: Arc<dyn RecordStore>,
    dispatcher: Arc<Dispatcher>,
    client: Arc<dyn MessagingClient>,
    clock: Arc<dyn Clock>,
    utc_offset: FixedOffset,
    tick_interval: Duration,
    tick_lock: Mutex<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        dispatcher: Arc<Dispatcher>,
        client: Arc<dyn MessagingClient>,
        clock: Arc<dyn Clock>,
        utc_offset: FixedOffset,
        tick_interval: Duration,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        ReminderScheduler {
            store,
            dispatcher,
            client,
            clock,
            utc_offset,
            tick_interval,
            tick_lock: Mutex::new(()),
            shutdown_tx,
        }
    }

    /// Spawns the tick loop. The first tick fires after one full interval.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await; // first tick completes immediately
            info!(
                "Reminder scheduler started (interval {:?})",
                self.tick_interval
            );
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        if let Err(e) = self.run_tick().await {
                            warn!("Scheduler tick failed: {e:#}");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Reminder scheduler stopped");
        })
    }

    /// Signals the loop to stop and waits out any tick already running.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let _guard = self.tick_lock.lock().await;
    }

    fn local_now(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.utc_offset).naive_local()
    }

    /// One pass over every owner. Also callable directly, which tests and
    /// operator tooling use; the internal lock keeps concurrent calls from
    /// double-dispatching.
    pub async fn run_tick(&self) -> Result<TickSummary> {
        let _guard = self.tick_lock.lock().await;

        if !self.client.is_ready().await {
            info!("Messaging client not ready; skipping tick");
            return Ok(TickSummary {
                skipped: true,
                ..TickSummary::default()
            });
        }

        let reference = self.local_now();
        let mut summary = TickSummary::default();

        for owner in self.store.owners().await? {
            match self.tick_owner(&owner, reference).await {
                Ok((dispatched, failed)) => {
                    summary.dispatched += dispatched;
                    summary.failed += failed;
                }
                Err(e) => warn!("Tick failed for owner {owner}: {e:#}"),
            }
        }

        if summary.dispatched > 0 || summary.failed > 0 {
            info!(
                "Tick done: {} dispatched, {} failed",
                summary.dispatched, summary.failed
            );
        }
        Ok(summary)
    }

    async fn tick_owner(&self, owner: &str, reference: NaiveDateTime) -> Result<(usize, usize)> {
        let snapshot = self.store.load(owner).await?;
        let mut dispatched = 0;
        let mut failed = 0;

        for record in &snapshot {
            // Re-read per record: a manual dispatch may have landed since the
            // owner snapshot was taken.
            let fresh = self
                .store
                .load(owner)
                .await?
                .into_iter()
                .find(|r| r.id == record.id);
            let Some(reminder) = fresh else { continue };

            // Freshest known state, fed to the rollover check below so idle
            // reminders never trigger a store write.
            let mut latest = reminder.clone();

            for target in due_targets(&reminder, reference) {
                let kind = match target {
                    Target::Main => TemplateKind::Main,
                    Target::Pre(_) => TemplateKind::PreReminder,
                };
                // due_targets returned Some occurrence, so this is Some too.
                let Some(occurrence) = current_occurrence(&reminder, reference) else {
                    continue;
                };

                match self.dispatcher.deliver(owner, kind, occurrence).await {
                    Ok(()) => {
                        let at = self.clock.now();
                        if let Some(updated) = self
                            .store
                            .update_one(
                                owner,
                                &reminder.id,
                                Box::new(move |r| r.mark_target_sent(target, at)),
                            )
                            .await?
                        {
                            latest = updated;
                        }
                        info!("Dispatched {target} of {} to {owner}", reminder.id);
                        dispatched += 1;
                    }
                    Err(e) => {
                        warn!("Dispatch of {target} of {} to {owner} failed: {e}", reminder.id);
                        if let Some(updated) = self
                            .store
                            .update_one(
                                owner,
                                &reminder.id,
                                Box::new(move |r| r.mark_target_failed(target)),
                            )
                            .await?
                        {
                            latest = updated;
                        }
                        failed += 1;
                    }
                }
            }

            self.roll_cycle(owner, &latest, reference).await?;
        }

        Ok((dispatched, failed))
    }

    /// Recurring day-of-week reminders reset their statuses once a fully-sent
    /// cycle's occurrence slides to the next week. The occurrence that was
    /// delivered is recorded first; the reset happens on a later tick when
    /// the computed occurrence has moved past it. `current` is the freshest
    /// known state: when it has nothing to roll, no store write is issued.
    async fn roll_cycle(
        &self,
        owner: &str,
        current: &Reminder,
        reference: NaiveDateTime,
    ) -> Result<()> {
        if !needs_roll(current, reference) {
            return Ok(());
        }
        self.store
            .update_one(
                owner,
                &current.id,
                Box::new(move |r| {
                    // Re-checked under the owner lock.
                    if !needs_roll(r, reference) {
                        return;
                    }
                    let Some(occurrence) = current_occurrence(r, reference) else {
                        return;
                    };
                    match r.recurring_status.last_occurrence {
                        None => r.recurring_status.last_occurrence = Some(occurrence),
                        Some(_) => r.reset_statuses(),
                    }
                }),
            )
            .await?;
        Ok(())
    }
}

/// Whether rollover bookkeeping would change anything for this record.
fn needs_roll(reminder: &Reminder, reference: NaiveDateTime) -> bool {
    if reminder.kind != ReminderKind::Recurring || !reminder.fully_sent() {
        return false;
    }
    let Some(occurrence) = current_occurrence(reminder, reference) else {
        return false;
    };
    match reminder.recurring_status.last_occurrence {
        None => true,
        Some(last) => last != occurrence,
    }
}
