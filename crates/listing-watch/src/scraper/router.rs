use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{ScrapeLogSummary, ScrapeOutcome};
use super::service::ScraperService;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub frequency: String,
}

/// Router builder exposing the scraper control surface.
pub fn scraper_router(service: Arc<ScraperService>) -> Router {
    Router::new()
        .route("/api/v1/property-scraper/start", post(start_handler))
        .route(
            "/api/v1/property-scraper/schedule",
            post(update_schedule_handler).get(schedule_handler),
        )
        .route("/api/v1/property-scraper/logs", get(logs_handler))
        .route("/api/v1/property-scraper/outcomes", get(outcomes_handler))
        .with_state(service)
}

pub(crate) async fn start_handler(
    State(service): State<Arc<ScraperService>>,
) -> Result<Json<Value>, AppError> {
    let report = service.start_now().await?;
    Ok(Json(json!({
        "message": "Scraper run completed",
        "report": report,
    })))
}

pub(crate) async fn update_schedule_handler(
    State(service): State<Arc<ScraperService>>,
    request: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = request?;
    let frequency = service.update_schedule(&request.frequency)?;
    Ok(Json(json!({
        "message": format!("Scraper schedule updated to: {frequency}"),
        "frequency": frequency,
        "nextFireAt": service.next_fire(),
    })))
}

pub(crate) async fn schedule_handler(State(service): State<Arc<ScraperService>>) -> Json<Value> {
    Json(json!({
        "frequency": service.current_schedule(),
        "nextFireAt": service.next_fire(),
        "running": service.is_running(),
    }))
}

pub(crate) async fn logs_handler(
    State(service): State<Arc<ScraperService>>,
) -> Result<Json<ScrapeLogSummary>, AppError> {
    Ok(Json(service.summary().await?))
}

pub(crate) async fn outcomes_handler(
    State(service): State<Arc<ScraperService>>,
) -> Result<Json<Vec<ScrapeOutcome>>, AppError> {
    Ok(Json(service.outcomes().await?))
}
