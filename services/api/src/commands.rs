use crate::infra::InMemoryOutcomeStore;
use chrono::Utc;
use clap::Args;
use listing_watch::config::AppConfig;
use listing_watch::error::AppError;
use listing_watch::scraper::{
    summarize, Cadence, CsvListingFile, CycleReport, CycleSettings, HttpPageFetcher, OutcomeSink,
    RunError, ScheduleClock, ScrapeCycle, ScrapeOutcome, ScrapeStatus,
};
use listing_watch::telemetry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct ScrapeArgs {
    /// Listing catalog CSV (defaults to SCRAPER_LISTINGS_CSV)
    #[arg(long)]
    pub(crate) listings: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct SchedulePreviewArgs {
    /// Cron expression to evaluate, e.g. "0 0 * * *"
    pub(crate) cron: String,
    /// Number of upcoming fire times to print
    #[arg(long, default_value_t = 5)]
    pub(crate) count: usize,
    /// Evaluate the cadence in the local timezone instead of UTC
    #[arg(long)]
    pub(crate) local: bool,
}

pub(crate) async fn run_scrape(args: ScrapeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(listings) = args.listings {
        config.scraper.listings_csv = listings;
    }
    telemetry::init(&config.telemetry)?;

    let outcomes = Arc::new(InMemoryOutcomeStore::default());
    let cycle = ScrapeCycle::new(
        Arc::new(CsvListingFile::new(config.scraper.listings_csv.clone())),
        outcomes.clone(),
        Arc::new(HttpPageFetcher::from_config(&config.scraper)?),
        CycleSettings::from(&config.scraper),
    );

    let report = cycle.run().await.map_err(RunError::from)?;
    let records = outcomes.find_all().await?;
    render_scrape_report(&config.scraper.default_cron, &report, &records);
    Ok(())
}

pub(crate) fn run_schedule_preview(args: SchedulePreviewArgs) -> Result<(), AppError> {
    let SchedulePreviewArgs { cron, count, local } = args;

    let cadence = Cadence::parse(&cron)?;
    let clock = if local {
        ScheduleClock::Local
    } else {
        ScheduleClock::Utc
    };
    let fires = clock.upcoming(&cadence, Utc::now(), count);

    println!("Cadence '{}' ({:?} clock)", cadence.expression(), clock);
    if fires.is_empty() {
        println!("  No upcoming fire times");
    }
    for (index, fire) in fires.iter().enumerate() {
        println!("  {:>2}. {}", index + 1, fire.to_rfc3339());
    }
    Ok(())
}

fn render_scrape_report(frequency: &str, report: &CycleReport, records: &[ScrapeOutcome]) {
    println!("Scrape cycle report");
    println!(
        "  Listings: {} total, {} eligible, {} skipped",
        report.listed, report.eligible, report.skipped
    );
    println!(
        "  Outcomes: {} succeeded, {} failed, {} not stored",
        report.succeeded, report.failed, report.write_errors
    );
    println!("  Elapsed: {} ms", report.elapsed_ms());

    if !records.is_empty() {
        println!("\nListings");
    }
    for record in records {
        let status = match record.status {
            ScrapeStatus::Success => "ok",
            ScrapeStatus::Failed => "FAILED",
            ScrapeStatus::None => "-",
        };
        let http = record
            .http_status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "unreachable".to_string());
        println!("  [{status:>6}] {} ({http}) {}", record.title, record.url);
    }

    let summary = summarize(frequency, records);
    println!(
        "\nSummary: {}/{} successful, schedule '{}'",
        summary.success_count, summary.total_count, summary.frequency
    );
}
