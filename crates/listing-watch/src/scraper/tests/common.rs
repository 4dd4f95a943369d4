use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::scraper::cycle::{CycleSettings, ScrapeCycle};
use crate::scraper::domain::{ListingRef, ScrapeOutcome};
use crate::scraper::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::scraper::repository::{ListingSource, OutcomeSink, RepositoryError};
use crate::scraper::runner::CycleTrigger;
use crate::scraper::ListingCatalog;

pub(super) const DOMAIN: &str = "apartmentlist.com";

pub(super) fn listing(slug: &str) -> ListingRef {
    ListingRef::new(
        format!("Listing {slug}"),
        format!("https://www.apartmentlist.com/tx/austin/{slug}"),
    )
}

pub(super) fn foreign_listing(slug: &str) -> ListingRef {
    ListingRef::new(
        format!("Foreign {slug}"),
        format!("https://other.com/{slug}"),
    )
}

pub(super) fn catalog(listings: Vec<ListingRef>) -> Arc<ListingCatalog> {
    Arc::new(ListingCatalog::new(listings))
}

pub(super) fn listing_payload(name: &str) -> Value {
    json!({ "name": name, "rent": 1850, "available_units": 2 })
}

pub(super) fn listing_page(name: &str) -> String {
    let state = json!({
        "props": { "pageProps": { "component": { "listing": listing_payload(name) } } }
    });
    format!(
        "<html><head></head><body><div id=\"__next\"></div>\
         <script id=\"__NEXT_DATA__\" type=\"application/json\">{state}</script></body></html>"
    )
}

pub(super) fn bare_page() -> String {
    "<html><body><h1>Listing removed</h1></body></html>".to_string()
}

pub(super) fn settings(delay: Duration) -> CycleSettings {
    CycleSettings {
        allowed_domain: DOMAIN.to_string(),
        request_delay: delay,
    }
}

pub(super) fn cycle_with(
    source: Arc<dyn ListingSource>,
    sink: Arc<dyn OutcomeSink>,
    fetcher: Arc<dyn PageFetcher>,
) -> ScrapeCycle {
    ScrapeCycle::new(source, sink, fetcher, settings(Duration::ZERO))
}

/// Outcome store with upsert-by-url semantics and a write counter.
#[derive(Default, Clone)]
pub(super) struct MemoryOutcomes {
    records: Arc<Mutex<BTreeMap<String, ScrapeOutcome>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryOutcomes {
    pub(super) fn records(&self) -> Vec<ScrapeOutcome> {
        self.records
            .lock()
            .expect("outcome mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub(super) fn get(&self, url: &str) -> Option<ScrapeOutcome> {
        self.records
            .lock()
            .expect("outcome mutex poisoned")
            .get(url)
            .cloned()
    }

    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutcomeSink for MemoryOutcomes {
    async fn upsert(&self, outcome: ScrapeOutcome) -> Result<(), RepositoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().expect("outcome mutex poisoned");
        match records.entry(outcome.url.clone()) {
            Entry::Occupied(mut stored) => stored.get_mut().refresh_from(outcome),
            Entry::Vacant(slot) => {
                slot.insert(outcome);
            }
        }
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<ScrapeOutcome>, RepositoryError> {
        Ok(self.records())
    }
}

pub(super) struct UnavailableSink;

#[async_trait]
impl OutcomeSink for UnavailableSink {
    async fn upsert(&self, _outcome: ScrapeOutcome) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn find_all(&self) -> Result<Vec<ScrapeOutcome>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct UnavailableSource;

#[async_trait]
impl ListingSource for UnavailableSource {
    async fn list(&self) -> Result<Vec<ListingRef>, RepositoryError> {
        Err(RepositoryError::Unavailable("catalog offline".to_string()))
    }
}

#[derive(Clone)]
pub(super) enum StubResponse {
    Page { status: u16, html: String },
    Unreachable,
}

/// Fetcher serving canned responses and recording every requested URL.
#[derive(Default, Clone)]
pub(super) struct StubFetcher {
    responses: Arc<Mutex<HashMap<String, StubResponse>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubFetcher {
    pub(super) fn with_page(self, url: &str, status: u16, html: String) -> Self {
        self.responses
            .lock()
            .expect("fetcher mutex poisoned")
            .insert(url.to_string(), StubResponse::Page { status, html });
        self
    }

    pub(super) fn with_unreachable(self, url: &str) -> Self {
        self.responses
            .lock()
            .expect("fetcher mutex poisoned")
            .insert(url.to_string(), StubResponse::Unreachable);
        self
    }

    pub(super) fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("fetcher mutex poisoned").clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requests
            .lock()
            .expect("fetcher mutex poisoned")
            .push(url.to_string());
        let response = self
            .responses
            .lock()
            .expect("fetcher mutex poisoned")
            .get(url)
            .cloned();
        match response {
            Some(StubResponse::Page { status, html }) => Ok(FetchedPage { html, status }),
            Some(StubResponse::Unreachable) | None => Err(request_failure(url)),
        }
    }
}

/// A transport-level failure, as `HttpPageFetcher` reports it when no response arrives.
pub(super) fn request_failure(url: &str) -> FetchError {
    let source = reqwest::Client::new()
        .get("unreachable-listing-host")
        .build()
        .expect_err("relative url never builds a request");
    FetchError::Request {
        url: url.to_string(),
        source,
    }
}

/// Fetcher that parks inside `fetch` until released, to hold a cycle in flight.
#[derive(Default, Clone)]
pub(super) struct GatedFetcher {
    pub(super) entered: Arc<Notify>,
    pub(super) release: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl GatedFetcher {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for GatedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(FetchedPage {
            html: listing_page(url),
            status: 200,
        })
    }
}

/// Trigger that counts fires and wakes a waiter on each one.
#[derive(Default)]
pub(super) struct CountingTrigger {
    fires: AtomicUsize,
    pub(super) fired: Notify,
}

impl CountingTrigger {
    pub(super) fn fires(&self) -> usize {
        self.fires.load(Ordering::SeqCst)
    }
}

impl CycleTrigger for CountingTrigger {
    fn fire(&self) {
        self.fires.fetch_add(1, Ordering::SeqCst);
        self.fired.notify_one();
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
