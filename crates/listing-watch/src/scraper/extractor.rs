//! Pulls the listing payload out of a server-rendered Next.js page.
//!
//! Listing pages embed their full page state as JSON inside
//! `<script id="__NEXT_DATA__">`; the listing itself lives at
//! `props.pageProps.component.listing`.

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

pub const EMBEDDED_STATE_SELECTOR: &str = "script#__NEXT_DATA__";
pub const LISTING_POINTER: &str = "/props/pageProps/component/listing";

/// Text content of the embedded page-state script, or an empty string.
pub fn extract_embedded_json(html: &str) -> String {
    let Ok(selector) = Selector::parse(EMBEDDED_STATE_SELECTOR) else {
        return String::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .unwrap_or_default()
}

/// Listing payload from the embedded state. `None` when the JSON is unreadable or
/// the listing node is missing or null.
pub fn extract_listing(json_text: &str) -> Option<Value> {
    if json_text.trim().is_empty() {
        return None;
    }

    let mut state: Value = match serde_json::from_str(json_text) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "embedded page state is not valid json");
            return None;
        }
    };

    match state.pointer_mut(LISTING_POINTER).map(Value::take) {
        Some(Value::Null) | None => {
            debug!(pointer = LISTING_POINTER, "listing node absent from page state");
            None
        }
        Some(listing) => Some(listing),
    }
}
