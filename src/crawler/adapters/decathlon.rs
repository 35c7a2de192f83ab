use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::crawler::adapters::rest_json;
use crate::crawler::adapters::PlaceholderLookup;
use crate::crawler::{
    BaseCrawler, RawResponse, RequestDetail, RequestMetadata, RequestStrategy,
    ResponseParserStrategy, TaskCreationStrategy,
};
use crate::models::{Slot, Venue};

pub const ORGANISATION_WEBSITE: &str = "https://www.decathlon.co.uk";
const LOOKAHEAD_DAYS: i64 = 10;

/// Decathlon's booking API never returns a price for pickleball courts —
/// every centre charges the same flat rate, so it is hard-coded here
/// rather than invented per-response.
const FLAT_PRICE: &str = "£6.00";

pub struct DecathlonRequestStrategy;

impl RequestStrategy for DecathlonRequestStrategy {
    fn generate_request_details(
        &self,
        venue: &Venue,
        fetch_date: NaiveDate,
        _token: Option<&str>,
    ) -> Vec<RequestDetail> {
        let url = format!(
            "https://www.decathlon.co.uk/api/activities/venue/{}/activity/pickleball-court/times?date={fetch_date}",
            venue.slug
        );
        let mut headers = HashMap::new();
        headers.insert("user-agent".to_string(), "sportscanner/0.1".to_string());

        vec![RequestDetail {
            url,
            headers,
            payload: None,
            metadata: RequestMetadata {
                category: "pickleball".to_string(),
                date: fetch_date,
                price: Some(FLAT_PRICE.to_string()),
                booking_url: None,
                venue: venue.clone(),
                duration_minutes: 60,
            },
        }]
    }
}

pub struct DecathlonResponseParser;

impl ResponseParserStrategy for DecathlonResponseParser {
    fn parse(&self, raw: &RawResponse) -> Result<Vec<Slot>, String> {
        let body: Value =
            serde_json::from_str(&raw.content).map_err(|error| format!("invalid JSON: {error}"))?;
        let data = body.get("data").and_then(Value::as_array).ok_or("missing data array")?;

        data.iter()
            .map(|block| {
                let formatted = block
                    .pointer("/starts_at/format_24_hour")
                    .and_then(Value::as_str)
                    .ok_or("missing starts_at.format_24_hour")?;
                let starting_time = NaiveTime::parse_from_str(formatted, "%H:%M")
                    .map_err(|error| format!("invalid starting time {formatted}: {error}"))?;
                let ending_time = starting_time + chrono::Duration::minutes(raw.metadata.duration_minutes);
                let spaces = i32::try_from(block.get("spaces").and_then(Value::as_i64).unwrap_or(0))
                    .unwrap_or(0);

                Ok(Slot {
                    composite_key: raw.metadata.venue.composite_key.clone(),
                    category: raw.metadata.category.clone(),
                    date: raw.metadata.date,
                    starting_time,
                    ending_time,
                    price: raw.metadata.price.clone().unwrap_or_else(|| FLAT_PRICE.to_string()),
                    spaces,
                    booking_url: raw.metadata.booking_url.clone(),
                    last_refreshed: None,
                })
            })
            .collect()
    }
}

pub struct DecathlonTaskCreationStrategy {
    pub placeholders: Arc<dyn PlaceholderLookup>,
}

#[async_trait]
impl TaskCreationStrategy for DecathlonTaskCreationStrategy {
    async fn fetch_and_transform(
        &self,
        client: &reqwest::Client,
        request: RequestDetail,
    ) -> Result<Vec<Slot>, String> {
        rest_json::fetch_and_transform(client, request, &DecathlonResponseParser, &self.placeholders).await
    }
}

pub fn build_crawler(placeholders: Arc<dyn PlaceholderLookup>) -> BaseCrawler {
    BaseCrawler {
        organisation_website: ORGANISATION_WEBSITE.to_string(),
        request_strategy: Box::new(DecathlonRequestStrategy),
        response_parser_strategy: Box::new(DecathlonResponseParser),
        task_creation_strategy: Box::new(DecathlonTaskCreationStrategy { placeholders }),
        lookahead_days: LOOKAHEAD_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sport;

    #[test]
    fn price_is_always_the_flat_rate() {
        let venue = Venue {
            composite_key: "dk123456".to_string(),
            organisation: "Decathlon".to_string(),
            organisation_website: ORGANISATION_WEBSITE.to_string(),
            venue_name: "Decathlon Surrey Quays".to_string(),
            slug: "surrey-quays".to_string(),
            sports: vec![Sport::Pickleball],
            postcode: None,
            address: None,
            latitude: 51.49,
            longitude: -0.05,
        };
        let requests = DecathlonRequestStrategy.generate_request_details(
            &venue,
            NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            None,
        );
        assert_eq!(requests[0].metadata.price.as_deref(), Some(FLAT_PRICE));
    }
}
