pub mod activelambeth;
pub mod better;
pub mod citysports;
pub mod decathlon;
pub mod haringey;
pub mod rest_json;
pub mod southwarkleisure;
pub mod towerhamlets;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::Slot;

const MAX_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Looks up the currently-stored master-table slots for a venue/date/sport,
/// used by REST Type A adapters to synthesise zero-space placeholder slots
/// when a provider's response carries no data for a date it was asked
/// about — an empty `data` array is a valid "nothing bookable" signal, not
/// a parse failure, so the previous refresh's known time-slots are
/// preserved with their availability zeroed out rather than dropped.
#[async_trait]
pub trait PlaceholderLookup: Send + Sync {
    async fn zero_space_slots(
        &self,
        category: &str,
        composite_key: &str,
        date: NaiveDate,
    ) -> Vec<Slot>;
}

/// Builds a `reqwest::HeaderMap` from a plain string map, silently
/// skipping any entry that isn't a valid header name/value pair.
pub fn header_map(headers: &std::collections::HashMap<String, String>) -> reqwest::header::HeaderMap {
    let mut map = reqwest::header::HeaderMap::new();
    for (key, value) in headers {
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(key.as_bytes()),
            reqwest::header::HeaderValue::from_str(value),
        ) {
            map.insert(name, value);
        }
    }
    map
}

/// Issues a GET with at most two attempts and a fixed 2s backoff on
/// transport failure or a 5xx response — the retry policy spec.md §5/§7
/// require uniformly of every adapter's outbound request, not just the
/// REST Type-A path. A non-5xx, non-success status (4xx) is returned
/// immediately without retrying, per spec.md §5 ("4xx responses are not
/// retried").
pub async fn get_with_retry(
    client: &reqwest::Client,
    url: &str,
    headers: &HashMap<String, String>,
) -> Result<reqwest::Response, String> {
    let mut last_error = String::new();

    for attempt in 1..=MAX_ATTEMPTS {
        let response = client.get(url).headers(header_map(headers)).send().await;

        let response = match response {
            Ok(response) => response,
            Err(error) => {
                last_error = format!("transport error: {error}");
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(RETRY_BACKOFF).await;
                    continue;
                }
                return Err(last_error);
            }
        };

        if response.status().is_server_error() {
            last_error = format!("server error: {}", response.status());
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(RETRY_BACKOFF).await;
                continue;
            }
            return Err(last_error);
        }

        return Ok(response);
    }

    Err(last_error)
}

/// A `PlaceholderLookup` that never has anything on file, for adapters or
/// tests that don't need the empty-response policy.
pub struct NoPlaceholders;

#[async_trait]
impl PlaceholderLookup for NoPlaceholders {
    async fn zero_space_slots(
        &self,
        _category: &str,
        _composite_key: &str,
        _date: NaiveDate,
    ) -> Vec<Slot> {
        Vec::new()
    }
}
