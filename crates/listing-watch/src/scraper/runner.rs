use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{error, info};

use super::cycle::{CycleError, ScrapeCycle};
use super::domain::CycleReport;

/// Something the scheduler can poke when the cadence fires.
pub trait CycleTrigger: Send + Sync + 'static {
    fn fire(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("a scrape cycle is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("scrape cycle task ended abnormally: {0}")]
    Interrupted(#[from] JoinError),
}

/// Single-flight gate in front of [`ScrapeCycle`]. The timer and on-demand starts both
/// go through here, so at most one cycle touches the third-party site at a time.
#[derive(Clone)]
pub struct CycleRunner {
    cycle: Arc<ScrapeCycle>,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the cycle future completes or is dropped.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CycleRunner {
    pub fn new(cycle: Arc<ScrapeCycle>) -> Self {
        Self {
            cycle,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cycle(&self) -> &Arc<ScrapeCycle> {
        &self.cycle
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Option<RunningGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(self.running.clone()))
    }

    /// Run a cycle and wait for it.
    ///
    /// The cycle lives on its own task, so dropping the returned future only stops the
    /// waiting; the cycle still visits every eligible URL.
    pub async fn run_now(&self) -> Result<CycleReport, RunError> {
        let guard = self.acquire().ok_or(RunError::AlreadyRunning)?;
        let cycle = self.cycle.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            cycle.run().await
        });
        Ok(task.await??)
    }

    /// Start a cycle on a detached task and return immediately.
    pub fn spawn(&self) -> TriggerOutcome {
        let Some(guard) = self.acquire() else {
            info!("scrape cycle already in flight, skipping trigger");
            return TriggerOutcome::AlreadyRunning;
        };

        let cycle = self.cycle.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(err) = cycle.run().await {
                error!(error = %err, "scheduled scrape cycle aborted");
            }
        });
        TriggerOutcome::Started
    }
}

impl CycleTrigger for CycleRunner {
    fn fire(&self) {
        info!("scheduled scrape cycle triggered");
        self.spawn();
    }
}
