pub mod adapters;
pub mod normalise;
pub mod orchestrator;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Slot, Venue};

/// A single outbound request an adapter wants made, plus enough metadata
/// for the response parser to stamp the resulting slots.
#[derive(Debug, Clone)]
pub struct RequestDetail {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub payload: Option<serde_json::Value>,
    pub metadata: RequestMetadata,
}

/// Carried alongside a request so the parser can build a `Slot` without
/// re-deriving context the request strategy already knew.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub category: String,
    pub date: NaiveDate,
    pub price: Option<String>,
    pub booking_url: Option<String>,
    pub venue: Venue,
    /// Slot duration in minutes, when the provider distinguishes multiple
    /// activity variants (e.g. Better's badminton-40min/60min) rather than
    /// returning an explicit end time per slot.
    pub duration_minutes: i64,
}

/// A raw, un-parsed HTTP response plus the request metadata that produced
/// it. This is the boundary object carried from the HTTP layer into a
/// provider's response parser.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub content: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub metadata: RequestMetadata,
}

/// Builds the set of requests to issue for one venue on one date. Adapters
/// that need an authentication token receive it here, already resolved by
/// the task-creation strategy.
pub trait RequestStrategy: Send + Sync {
    fn generate_request_details(
        &self,
        venue: &Venue,
        fetch_date: NaiveDate,
        token: Option<&str>,
    ) -> Vec<RequestDetail>;
}

/// Turns one raw response into zero or more unified slots. Implementations
/// must never panic on malformed input — a parse failure is logged and the
/// response dropped, siblings are unaffected.
pub trait ResponseParserStrategy: Send + Sync {
    fn parse(&self, raw: &RawResponse) -> Result<Vec<Slot>, String>;
}

/// Owns how requests for one venue/date become concurrently-issued tasks,
/// including provider-specific policy such as the empty-response
/// zero-spaces placeholder (REST Type A) or one-shot token acquisition
/// (Type C).
#[async_trait]
pub trait TaskCreationStrategy: Send + Sync {
    async fn fetch_and_transform(
        &self,
        client: &reqwest::Client,
        request: RequestDetail,
    ) -> Result<Vec<Slot>, String>;
}

/// Composes the three adapter capabilities into one crawler, the way the
/// original Python `BaseCrawler` composed its three strategy objects
/// instead of subclassing. No adapter concrete type inherits from this —
/// it is held and driven generically by the orchestrator.
pub struct BaseCrawler {
    pub organisation_website: String,
    pub request_strategy: Box<dyn RequestStrategy>,
    pub response_parser_strategy: Box<dyn ResponseParserStrategy>,
    pub task_creation_strategy: Box<dyn TaskCreationStrategy>,
    /// Upper bound, in days from today, on how far ahead this provider
    /// will answer queries for.
    pub lookahead_days: i64,
}

impl std::fmt::Debug for BaseCrawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseCrawler")
            .field("organisation_website", &self.organisation_website)
            .field("lookahead_days", &self.lookahead_days)
            .finish()
    }
}

/// Intersects caller-requested dates with this adapter's allowable
/// look-ahead window, per adapter policy (§4.E).
pub fn filter_allowable_dates(requested: &[NaiveDate], lookahead_days: i64) -> Vec<NaiveDate> {
    let today = crate::crawler::normalise::today_london();
    let allowable_end = today + chrono::Duration::days(lookahead_days);
    requested
        .iter()
        .copied()
        .filter(|date| *date >= today && *date <= allowable_end)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_allowable_dates_drops_out_of_window_dates() {
        let today = crate::crawler::normalise::today_london();
        let requested = vec![
            today - chrono::Duration::days(1),
            today,
            today + chrono::Duration::days(3),
            today + chrono::Duration::days(30),
        ];
        let allowed = filter_allowable_dates(&requested, 6);
        assert_eq!(allowed, vec![today, today + chrono::Duration::days(3)]);
    }
}
