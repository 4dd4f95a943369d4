use async_trait::async_trait;
use listing_watch::scraper::{OutcomeSink, RepositoryError, ScrapeOutcome};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Outcome log keyed by listing URL. A refresh keeps the stored title unless it is blank.
/// Contents are lost on restart.
#[derive(Default, Clone)]
pub(crate) struct InMemoryOutcomeStore {
    records: Arc<Mutex<BTreeMap<String, ScrapeOutcome>>>,
}

#[async_trait]
impl OutcomeSink for InMemoryOutcomeStore {
    async fn upsert(&self, outcome: ScrapeOutcome) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("outcome store mutex poisoned");
        match guard.entry(outcome.url.clone()) {
            Entry::Occupied(mut stored) => stored.get_mut().refresh_from(outcome),
            Entry::Vacant(slot) => {
                slot.insert(outcome);
            }
        }
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<ScrapeOutcome>, RepositoryError> {
        let guard = self.records.lock().expect("outcome store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[cfg(test)]
impl InMemoryOutcomeStore {
    fn len(&self) -> usize {
        self.records.lock().expect("outcome store mutex poisoned").len()
    }
}
