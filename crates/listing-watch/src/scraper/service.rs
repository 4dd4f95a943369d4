use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::cycle::ScrapeCycle;
use super::domain::{CycleReport, ScrapeLogSummary, ScrapeOutcome};
use super::repository::{OutcomeSink, RepositoryError};
use super::runner::{CycleRunner, RunError, TriggerOutcome};
use super::schedule::{InvalidScheduleError, ScheduleClock, ScheduleState};
use super::scheduler::{ScheduleJob, Scheduler};
use super::summary::summarize;

/// Service composing the single-flight runner, the scheduled job and the outcome log.
pub struct ScraperService {
    runner: Arc<CycleRunner>,
    job: ScheduleJob,
    state: ScheduleState,
    sink: Arc<dyn OutcomeSink>,
}

impl ScraperService {
    /// Wire the cycle behind the runner and start the recurring job at `default_cron`.
    /// Must be called from within a tokio runtime.
    pub fn start(
        cycle: ScrapeCycle,
        default_cron: &str,
        clock: ScheduleClock,
    ) -> Result<Self, InvalidScheduleError> {
        let sink = cycle.sink().clone();
        let runner = Arc::new(CycleRunner::new(Arc::new(cycle)));
        let state = ScheduleState::new(default_cron.trim());
        let job = Scheduler::start(runner.clone(), state.clone(), clock)?;

        Ok(Self {
            runner,
            job,
            state,
            sink,
        })
    }

    /// Run one cycle now and wait for it to finish.
    pub async fn start_now(&self) -> Result<CycleReport, RunError> {
        self.runner.run_now().await
    }

    /// Kick off a cycle in the background.
    pub fn trigger(&self) -> TriggerOutcome {
        self.runner.spawn()
    }

    pub fn update_schedule(&self, expression: &str) -> Result<String, InvalidScheduleError> {
        self.job.update_schedule(expression)
    }

    pub fn current_schedule(&self) -> String {
        self.state.current()
    }

    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.job.next_fire()
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    pub async fn outcomes(&self) -> Result<Vec<ScrapeOutcome>, RepositoryError> {
        self.sink.find_all().await
    }

    pub async fn summary(&self) -> Result<ScrapeLogSummary, RepositoryError> {
        let outcomes = self.sink.find_all().await?;
        Ok(summarize(self.state.current(), &outcomes))
    }

    pub fn shutdown(&self) {
        self.job.stop();
    }
}
