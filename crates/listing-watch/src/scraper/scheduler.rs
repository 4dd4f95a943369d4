use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::runner::CycleTrigger;
use super::schedule::{Cadence, InvalidScheduleError, ScheduleClock, ScheduleState};

pub const SCRAPER_JOB_NAME: &str = "scraper";

/// Starts the recurring scraper job.
pub struct Scheduler;

impl Scheduler {
    /// Register the job with the cadence currently held in `state` and start its timer.
    ///
    /// The returned handle is the only way to reach the job, so holding one handle
    /// means exactly one job exists.
    pub fn start<T: CycleTrigger>(
        trigger: Arc<T>,
        state: ScheduleState,
        clock: ScheduleClock,
    ) -> Result<ScheduleJob, InvalidScheduleError> {
        let cadence = Cadence::parse(&state.current())?;
        let (cadence_tx, cadence_rx) = watch::channel(cadence);
        let task = tokio::spawn(drive(cadence_rx, trigger, clock));

        info!(job = SCRAPER_JOB_NAME, cadence = %state.current(), "scheduler started");
        Ok(ScheduleJob {
            cadence_tx,
            state,
            clock,
            task,
        })
    }
}

/// Handle to the running scraper job.
pub struct ScheduleJob {
    cadence_tx: watch::Sender<Cadence>,
    state: ScheduleState,
    clock: ScheduleClock,
    task: JoinHandle<()>,
}

impl ScheduleJob {
    pub fn name(&self) -> &'static str {
        SCRAPER_JOB_NAME
    }

    /// Swap the cadence of the running job. The countdown restarts from now and any
    /// cycle already in flight carries on undisturbed.
    ///
    /// The recorded expression is written while the channel's value is locked, so
    /// concurrent updates can never leave the state naming a cadence the timer isn't on.
    pub fn update_schedule(&self, expression: &str) -> Result<String, InvalidScheduleError> {
        let cadence = Cadence::parse(expression)?;
        let accepted = cadence.expression().to_string();

        self.cadence_tx.send_modify(|current| {
            *current = cadence;
            self.state.replace(accepted.clone());
        });
        info!(job = SCRAPER_JOB_NAME, cadence = %accepted, "scraper schedule updated");
        Ok(accepted)
    }

    pub fn current_schedule(&self) -> String {
        self.state.current()
    }

    /// Expression of the cadence the timer is running on.
    pub(crate) fn active_expression(&self) -> String {
        self.cadence_tx.borrow().expression().to_string()
    }

    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.clock
            .next_after(&self.cadence_tx.borrow(), Utc::now())
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(&self) {
        if !self.task.is_finished() {
            info!(job = SCRAPER_JOB_NAME, "scheduler stopped");
        }
        self.task.abort();
    }
}

impl Drop for ScheduleJob {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drive<T: CycleTrigger>(
    mut cadence_rx: watch::Receiver<Cadence>,
    trigger: Arc<T>,
    clock: ScheduleClock,
) {
    let mut last_fire: Option<DateTime<Utc>> = None;

    loop {
        let now = Utc::now();
        let after = last_fire.map_or(now, |fired| fired.max(now));
        let next = clock.next_after(&cadence_rx.borrow_and_update(), after);

        let Some(next) = next else {
            debug!(job = SCRAPER_JOB_NAME, "cadence has no upcoming fire time");
            if cadence_rx.changed().await.is_err() {
                return;
            }
            continue;
        };

        let wait = (next - now).to_std().unwrap_or_default();
        debug!(job = SCRAPER_JOB_NAME, next = %next, "waiting for next fire");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                last_fire = Some(next);
                trigger.fire();
            }
            changed = cadence_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                last_fire = None;
            }
        }
    }
}
