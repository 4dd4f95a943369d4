use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A catalog entry pointing at the canonical third-party listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRef {
    pub title: String,
    pub url: String,
}

impl ListingRef {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Last known scrape status of a listing URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    #[default]
    None,
    Success,
    Failed,
}

impl ScrapeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ScrapeStatus::None => "none",
            ScrapeStatus::Success => "success",
            ScrapeStatus::Failed => "failed",
        }
    }
}

/// Latest outcome for one URL. The sink keeps exactly one per URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOutcome {
    pub url: String,
    pub title: String,
    pub status: ScrapeStatus,
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ScrapeOutcome {
    /// Outcome for a URL whose request never produced a response.
    pub fn unreachable(listing: &ListingRef, scraped_at: DateTime<Utc>) -> Self {
        Self {
            url: listing.url.clone(),
            title: listing.title.clone(),
            status: ScrapeStatus::Failed,
            scraped_at,
            http_status: None,
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ScrapeStatus::Success
    }

    /// Overwrite the scrape result with `latest`. The stored title survives unless it is blank.
    pub fn refresh_from(&mut self, latest: ScrapeOutcome) {
        if self.title.trim().is_empty() {
            self.title = latest.title;
        }
        self.status = latest.status;
        self.scraped_at = latest.scraped_at;
        self.http_status = latest.http_status;
        self.payload = latest.payload;
    }
}

/// Read projection over every stored outcome, served by the logs endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeLogSummary {
    pub frequency: String,
    pub most_recent_scraped_at: Option<DateTime<Utc>>,
    pub total_count: usize,
    pub success_count: usize,
}

/// Counters describing one completed scrape cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub listed: usize,
    pub eligible: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub write_errors: usize,
}

impl CycleReport {
    pub(crate) fn begin(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            listed: 0,
            eligible: 0,
            skipped: 0,
            succeeded: 0,
            failed: 0,
            write_errors: 0,
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
