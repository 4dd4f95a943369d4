//! Scheduled re-scraping of brokerage listing pages.
//!
//! The [`scraper`] module holds the core: a cron-driven [`scraper::Scheduler`], a
//! sequential [`scraper::ScrapeCycle`] and the collaborator traits it runs against.

pub mod config;
pub mod error;
pub mod scraper;
pub mod telemetry;
