use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use super::domain::{CycleReport, ListingRef, ScrapeOutcome, ScrapeStatus};
use super::extractor::{extract_embedded_json, extract_listing};
use super::fetcher::PageFetcher;
use super::repository::{ListingSource, OutcomeSink, RepositoryError};
use crate::config::ScraperConfig;

/// Settings that shape a single pass over the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSettings {
    pub allowed_domain: String,
    pub request_delay: Duration,
}

impl From<&ScraperConfig> for CycleSettings {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            allowed_domain: config.allowed_domain.clone(),
            request_delay: config.request_delay,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("unable to load listings: {0}")]
    ListSource(#[source] RepositoryError),
}

/// `true` when the URL's host, minus a leading `www.`, is `domain`.
pub fn is_eligible(url: &str, domain: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(%url, error = %err, "skipping unparseable listing url");
            return false;
        }
    };

    parsed
        .host_str()
        .map(|host| host.strip_prefix("www.").unwrap_or(host))
        .is_some_and(|host| host.eq_ignore_ascii_case(domain))
}

/// Decide the stored status for a fetched page.
///
/// Success requires both an HTTP 200 and an extracted listing; anything else is
/// recorded as failed without a payload.
pub fn classify(http_status: u16, listing: Option<Value>) -> (ScrapeStatus, Option<Value>) {
    match listing {
        Some(payload) if http_status == 200 => (ScrapeStatus::Success, Some(payload)),
        Some(_) => {
            debug!(http_status, "discarding listing extracted from non-200 response");
            (ScrapeStatus::Failed, None)
        }
        None => (ScrapeStatus::Failed, None),
    }
}

/// One sequential pass over every eligible catalog URL.
pub struct ScrapeCycle {
    source: Arc<dyn ListingSource>,
    sink: Arc<dyn OutcomeSink>,
    fetcher: Arc<dyn PageFetcher>,
    settings: CycleSettings,
}

impl ScrapeCycle {
    pub fn new(
        source: Arc<dyn ListingSource>,
        sink: Arc<dyn OutcomeSink>,
        fetcher: Arc<dyn PageFetcher>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            source,
            sink,
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub fn sink(&self) -> &Arc<dyn OutcomeSink> {
        &self.sink
    }

    /// Visit every eligible URL once. Only a failing listing source aborts the pass;
    /// per-URL failures are stored as failed outcomes.
    pub async fn run(&self) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::begin(Utc::now());

        let listings = self.source.list().await.map_err(|err| {
            error!(error = %err, "listing source failed, aborting scrape cycle");
            CycleError::ListSource(err)
        })?;
        report.listed = listings.len();

        let (eligible, skipped): (Vec<ListingRef>, Vec<ListingRef>) = listings
            .into_iter()
            .partition(|listing| is_eligible(&listing.url, &self.settings.allowed_domain));
        for listing in &skipped {
            debug!(url = %listing.url, "skipping listing outside allowed domain");
        }
        report.eligible = eligible.len();
        report.skipped = skipped.len();

        info!(
            listed = report.listed,
            eligible = report.eligible,
            "starting scrape cycle"
        );

        let last = eligible.len().saturating_sub(1);
        for (index, listing) in eligible.iter().enumerate() {
            let outcome = self.scrape(listing).await;
            let status = outcome.status;

            match self.sink.upsert(outcome).await {
                Ok(()) => {
                    match status {
                        ScrapeStatus::Success => report.succeeded += 1,
                        _ => report.failed += 1,
                    }
                    info!(url = %listing.url, status = status.label(), "recorded scrape outcome");
                    if index < last && !self.settings.request_delay.is_zero() {
                        tokio::time::sleep(self.settings.request_delay).await;
                    }
                }
                Err(err) => {
                    report.write_errors += 1;
                    error!(url = %listing.url, error = %err, "failed to store scrape outcome");
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            write_errors = report.write_errors,
            elapsed_ms = report.elapsed_ms(),
            "scrape cycle finished"
        );
        Ok(report)
    }

    async fn scrape(&self, listing: &ListingRef) -> ScrapeOutcome {
        let page = match self.fetcher.fetch(&listing.url).await {
            Ok(page) => page,
            Err(err) => {
                warn!(url = %listing.url, error = %err, "listing page fetch failed");
                return ScrapeOutcome::unreachable(listing, Utc::now());
            }
        };

        if !page.is_ok() {
            warn!(url = %listing.url, http_status = page.status, "listing page returned non-200");
        }

        let listing_payload = extract_listing(&extract_embedded_json(&page.html));
        if listing_payload.is_none() {
            warn!(url = %listing.url, "no listing payload found in page");
        }

        let (status, payload) = classify(page.status, listing_payload);
        ScrapeOutcome {
            url: listing.url.clone(),
            title: listing.title.clone(),
            status,
            scraped_at: Utc::now(),
            http_status: Some(page.status),
            payload,
        }
    }
}
