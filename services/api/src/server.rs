use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryOutcomeStore};
use crate::routes::with_scraper_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use listing_watch::config::AppConfig;
use listing_watch::error::AppError;
use listing_watch::scraper::{
    CsvListingFile, CycleSettings, HttpPageFetcher, ScrapeCycle, ScraperService, TriggerOutcome,
};
use listing_watch::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(listings) = args.listings.take() {
        config.scraper.listings_csv = listings;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let source = Arc::new(CsvListingFile::new(config.scraper.listings_csv.clone()));
    let outcomes = Arc::new(InMemoryOutcomeStore::default());
    let fetcher = Arc::new(HttpPageFetcher::from_config(&config.scraper)?);
    let cycle = ScrapeCycle::new(
        source,
        outcomes,
        fetcher,
        CycleSettings::from(&config.scraper),
    );
    let scraper = Arc::new(ScraperService::start(
        cycle,
        &config.scraper.default_cron,
        config.scraper.schedule_clock,
    )?);

    if config.scraper.run_on_start && scraper.trigger() == TriggerOutcome::AlreadyRunning {
        warn!("initial scrape cycle skipped, another cycle is in flight");
    }

    let app = with_scraper_routes(scraper.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        listings = %config.scraper.listings_csv.display(),
        cadence = %scraper.current_schedule(),
        "listing watch ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    scraper.shutdown();
    info!("listing watch stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
