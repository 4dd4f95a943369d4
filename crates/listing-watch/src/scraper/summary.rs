use super::domain::{ScrapeLogSummary, ScrapeOutcome};

/// Fold the stored outcomes into the operator-facing summary.
///
/// An empty log is a normal state before the first cycle and yields zero counts.
pub fn summarize(frequency: impl Into<String>, outcomes: &[ScrapeOutcome]) -> ScrapeLogSummary {
    ScrapeLogSummary {
        frequency: frequency.into(),
        most_recent_scraped_at: outcomes.iter().map(|outcome| outcome.scraped_at).max(),
        total_count: outcomes.len(),
        success_count: outcomes.iter().filter(|outcome| outcome.is_success()).count(),
    }
}
