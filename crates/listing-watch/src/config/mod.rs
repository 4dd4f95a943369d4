use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::scraper::{Cadence, ScheduleClock};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scraper: ScraperConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");
        let log_format = LogFormat::parse(&var_or("APP_LOG_FORMAT", "compact"))?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            scraper: ScraperConfig::from_env()?,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = var_or(key, default);
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidNumber { key, value: raw })
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Output style for the fmt subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            _ => Err(ConfigError::InvalidLogFormat(value.to_string())),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Knobs for the listing scraper: who we visit, how politely, and how often.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub allowed_domain: String,
    pub request_delay: Duration,
    pub bypass_cookie: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub default_cron: String,
    pub schedule_clock: ScheduleClock,
    pub listings_csv: PathBuf,
    pub run_on_start: bool,
}

pub const DEFAULT_ALLOWED_DOMAIN: &str = "apartmentlist.com";
pub const DEFAULT_BYPASS_COOKIE: &str = "geofence_bypass=true";
pub const DEFAULT_CRON: &str = "0 0 * * *";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            allowed_domain: DEFAULT_ALLOWED_DOMAIN.to_string(),
            request_delay: Duration::from_millis(2000),
            bypass_cookie: DEFAULT_BYPASS_COOKIE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            default_cron: DEFAULT_CRON.to_string(),
            schedule_clock: ScheduleClock::Utc,
            listings_csv: PathBuf::from("data/listings.csv"),
            run_on_start: false,
        }
    }
}

impl ScraperConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let delay_ms: u64 = parse_number("SCRAPER_REQUEST_DELAY_MS", "2000")?;
        let timeout_secs: u64 = parse_number("SCRAPER_TIMEOUT_SECS", "30")?;

        let default_cron = var_or("SCRAPER_DEFAULT_CRON", DEFAULT_CRON);
        Cadence::parse(&default_cron).map_err(|err| ConfigError::InvalidCron(err.to_string()))?;

        let clock_raw = var_or("SCRAPER_SCHEDULE_CLOCK", "utc");
        let schedule_clock =
            ScheduleClock::parse(&clock_raw).ok_or(ConfigError::InvalidClock(clock_raw))?;

        let run_on_start = matches!(
            var_or("SCRAPER_RUN_ON_START", "false")
                .trim()
                .to_ascii_lowercase()
                .as_str(),
            "1" | "true" | "yes"
        );

        Ok(Self {
            allowed_domain: var_or("SCRAPER_ALLOWED_DOMAIN", DEFAULT_ALLOWED_DOMAIN),
            request_delay: Duration::from_millis(delay_ms),
            bypass_cookie: var_or("SCRAPER_BYPASS_COOKIE", DEFAULT_BYPASS_COOKIE),
            user_agent: var_or("SCRAPER_USER_AGENT", DEFAULT_USER_AGENT),
            request_timeout: Duration::from_secs(timeout_secs),
            default_cron,
            schedule_clock,
            listings_csv: PathBuf::from(var_or("SCRAPER_LISTINGS_CSV", "data/listings.csv")),
            run_on_start,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidLogFormat(String),
    InvalidCron(String),
    InvalidClock(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative integer, got '{value}'")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'pretty', got '{value}'")
            }
            ConfigError::InvalidCron(reason) => {
                write!(f, "SCRAPER_DEFAULT_CRON is not a valid cron expression: {reason}")
            }
            ConfigError::InvalidClock(value) => {
                write!(f, "SCRAPER_SCHEDULE_CLOCK must be 'utc' or 'local', got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
