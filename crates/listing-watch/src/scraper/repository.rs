use async_trait::async_trait;

use super::domain::{ListingRef, ScrapeOutcome};

/// Read-only view of the brokerage catalog. May legitimately return nothing.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn list(&self) -> Result<Vec<ListingRef>, RepositoryError>;
}

/// Storage for the latest outcome of every scraped URL, keyed by URL.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Replace the stored outcome for `outcome.url`, or insert it if none exists.
    async fn upsert(&self, outcome: ScrapeOutcome) -> Result<(), RepositoryError>;
    async fn find_all(&self) -> Result<Vec<ScrapeOutcome>, RepositoryError>;
}

/// Error enumeration for collaborator storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
