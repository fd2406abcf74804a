//! Best-effort geolocation lookup used when opening a session.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};

pub const DEFAULT_GEO_ENDPOINT: &str = "https://ipapi.co/json/";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);
const KEPT_KEYS: [&str; 5] = ["city", "region", "country_name", "latitude", "longitude"];

/// Resolves a coarse location from a public IP geolocation endpoint.
/// Any failure (network, timeout, unexpected shape) yields `None`; a
/// session is never blocked on this lookup.
pub async fn resolve_location(client: &Client, endpoint: &str) -> Option<Value> {
    let response = client
        .get(endpoint)
        .timeout(LOOKUP_TIMEOUT)
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body: Value = response.json().await.ok()?;
    let source = body.as_object()?;

    let mut kept = Map::new();
    for key in KEPT_KEYS {
        if let Some(value) = source.get(key) {
            if !value.is_null() {
                kept.insert(key.to_string(), value.clone());
            }
        }
    }
    if kept.is_empty() {
        None
    } else {
        Some(Value::Object(kept))
    }
}
