use crate::config::ConfigError;
use crate::scraper::{CatalogError, FetchError, InvalidScheduleError, RepositoryError, RunError};
use crate::telemetry::TelemetryError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Fetcher(FetchError),
    Catalog(CatalogError),
    Schedule(InvalidScheduleError),
    Run(RunError),
    Repository(RepositoryError),
    Request(JsonRejection),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Fetcher(err) => write!(f, "fetcher error: {}", err),
            AppError::Catalog(err) => write!(f, "catalog error: {}", err),
            AppError::Schedule(err) => write!(f, "schedule error: {}", err),
            AppError::Run(err) => write!(f, "scrape error: {}", err),
            AppError::Repository(err) => write!(f, "storage error: {}", err),
            AppError::Request(err) => write!(f, "invalid request body: {}", err.body_text()),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Fetcher(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Schedule(err) => Some(err),
            AppError::Run(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::Request(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Schedule(_) | AppError::Request(_) => StatusCode::BAD_REQUEST,
            AppError::Run(RunError::AlreadyRunning) => StatusCode::CONFLICT,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Fetcher(_)
            | AppError::Catalog(_)
            | AppError::Run(_)
            | AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<FetchError> for AppError {
    fn from(value: FetchError) -> Self {
        Self::Fetcher(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<InvalidScheduleError> for AppError {
    fn from(value: InvalidScheduleError) -> Self {
        Self::Schedule(value)
    }
}

impl From<RunError> for AppError {
    fn from(value: RunError) -> Self {
        Self::Run(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        Self::Request(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_errors_map_to_bad_request() {
        let err = AppError::from(InvalidScheduleError {
            expression: "not-a-cron".to_string(),
            reason: "unparseable".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn in_flight_cycle_maps_to_conflict() {
        let err = AppError::from(RunError::AlreadyRunning);
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn storage_errors_map_to_internal_error() {
        let err = AppError::from(RepositoryError::Unavailable("offline".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
