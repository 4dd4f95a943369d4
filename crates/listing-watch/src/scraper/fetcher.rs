use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, REFERER};
use reqwest::Client;
use tracing::debug;

use crate::config::ScraperConfig;

/// Raw response of a listing page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub status: u16,
}

impl FetchedPage {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("invalid header value for {name}: {value}")]
    InvalidHeader { name: &'static str, value: String },
    #[error("unable to build http client: {0}")]
    Client(reqwest::Error),
}

/// Retrieves listing pages. Non-200 responses are data, not errors.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

const REFERRER_POLICY_HEADER: HeaderName = HeaderName::from_static("referrer-policy");
const REFERRER_POLICY: &str = "strict-origin-when-cross-origin";

/// reqwest-backed fetcher that carries the geofence bypass cookie on every request.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    cookie: HeaderValue,
}

impl HttpPageFetcher {
    pub fn new(
        bypass_cookie: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let cookie =
            HeaderValue::from_str(bypass_cookie).map_err(|_| FetchError::InvalidHeader {
                name: "cookie",
                value: bypass_cookie.to_string(),
            })?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, cookie })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self, FetchError> {
        Self::new(
            &config.bypass_cookie,
            &config.user_agent,
            config.request_timeout,
        )
    }

    fn headers_for(&self, url: &str) -> Result<HeaderMap, FetchError> {
        let referer = HeaderValue::from_str(url).map_err(|_| FetchError::InvalidHeader {
            name: "referer",
            value: url.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, self.cookie.clone());
        headers.insert(REFERER, referer);
        headers.insert(
            REFERRER_POLICY_HEADER,
            HeaderValue::from_static(REFERRER_POLICY),
        );
        Ok(headers)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let request_error = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .headers(self.headers_for(url)?)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status().as_u16();
        let html = response.text().await.map_err(request_error)?;
        debug!(%url, status, bytes = html.len(), "fetched listing page");

        Ok(FetchedPage { html, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_cookie_with_control_characters() {
        let err = HttpPageFetcher::new("bypass=\ntrue", "agent", Duration::from_secs(1))
            .expect_err("newline is not a valid header value");
        assert!(matches!(err, FetchError::InvalidHeader { name: "cookie", .. }));
    }

    #[test]
    fn request_headers_carry_cookie_and_referer() {
        let fetcher = HttpPageFetcher::new(
            "geofence_bypass=true",
            "listing-watch-test",
            Duration::from_secs(1),
        )
        .expect("fetcher builds");
        let url = "https://www.apartmentlist.com/tx/austin/riverside-lofts";
        let headers = fetcher.headers_for(url).expect("headers build");

        assert_eq!(headers[COOKIE], "geofence_bypass=true");
        assert_eq!(headers[REFERER], url);
        assert_eq!(headers[REFERRER_POLICY_HEADER], REFERRER_POLICY);
    }
}
