//! Scheduled re-scraping of catalog listing pages.
//!
//! A [`Scheduler`] owns one recurring job that fires the [`CycleRunner`]; the runner
//! lets one [`ScrapeCycle`] at a time walk the [`ListingSource`], fetch each eligible
//! page, pull the embedded listing out of it and upsert the outcome into the
//! [`OutcomeSink`].

pub mod catalog;
pub mod cycle;
pub mod domain;
pub mod extractor;
pub mod fetcher;
pub mod repository;
pub mod router;
pub mod runner;
pub mod schedule;
pub mod scheduler;
pub mod service;
pub mod summary;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, CsvListingFile, ListingCatalog};
pub use cycle::{classify, is_eligible, CycleError, CycleSettings, ScrapeCycle};
pub use domain::{CycleReport, ListingRef, ScrapeLogSummary, ScrapeOutcome, ScrapeStatus};
pub use extractor::{extract_embedded_json, extract_listing};
pub use fetcher::{FetchError, FetchedPage, HttpPageFetcher, PageFetcher};
pub use repository::{ListingSource, OutcomeSink, RepositoryError};
pub use router::scraper_router;
pub use runner::{CycleRunner, CycleTrigger, RunError, TriggerOutcome};
pub use schedule::{Cadence, InvalidScheduleError, ScheduleClock, ScheduleState};
pub use scheduler::{ScheduleJob, Scheduler, SCRAPER_JOB_NAME};
pub use service::ScraperService;
pub use summary::summarize;
