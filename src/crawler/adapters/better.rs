use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};
use serde_json::Value;

use crate::crawler::adapters::rest_json;
use crate::crawler::adapters::PlaceholderLookup;
use crate::crawler::normalise::clean_price;
use crate::crawler::{
    BaseCrawler, RawResponse, RequestDetail, RequestMetadata, RequestStrategy,
    ResponseParserStrategy, TaskCreationStrategy,
};
use crate::models::{Slot, Venue};

pub const ORGANISATION_WEBSITE: &str = "https://www.better.org.uk";
const LOOKAHEAD_DAYS: i64 = 6;

/// `(activity_id, duration_minutes)` pairs the provider exposes for
/// badminton — every venue is queried for both variants on every date.
const ACTIVITY_VARIANTS: [(&str, i64); 2] = [("badminton-40min", 40), ("badminton-60min", 60)];

pub struct BetterRequestStrategy;

impl RequestStrategy for BetterRequestStrategy {
    fn generate_request_details(
        &self,
        venue: &Venue,
        fetch_date: NaiveDate,
        _token: Option<&str>,
    ) -> Vec<RequestDetail> {
        ACTIVITY_VARIANTS
            .iter()
            .map(|(activity_id, duration_minutes)| {
                let url = format!(
                    "https://better-admin.org.uk/api/activities/venue/{}/activity/{activity_id}/times?date={fetch_date}",
                    venue.slug
                );
                let booking_url = format!(
                    "https://bookings.better.org.uk/location/{}/{activity_id}/{fetch_date}/by-time/",
                    venue.slug
                );
                let mut headers = HashMap::new();
                headers.insert("origin".to_string(), "https://bookings.better.org.uk".to_string());
                headers.insert("referer".to_string(), "https://bookings.better.org.uk/".to_string());
                headers.insert(
                    "user-agent".to_string(),
                    "sportscanner/0.1 (+https://github.com)".to_string(),
                );

                RequestDetail {
                    url,
                    headers,
                    payload: None,
                    metadata: RequestMetadata {
                        category: "badminton".to_string(),
                        date: fetch_date,
                        price: None,
                        booking_url: Some(booking_url),
                        venue: venue.clone(),
                        duration_minutes: *duration_minutes,
                    },
                }
            })
            .collect()
    }
}

pub struct BetterResponseParser;

impl ResponseParserStrategy for BetterResponseParser {
    fn parse(&self, raw: &RawResponse) -> Result<Vec<Slot>, String> {
        let body: Value = serde_json::from_str(&raw.content)
            .map_err(|error| format!("invalid JSON: {error}"))?;

        let blocks = extract_slot_blocks(&body)?;

        blocks
            .iter()
            .map(|block| slot_from_block(block, raw))
            .collect()
    }
}

/// The provider's `data` field is accepted in both shapes the original
/// parser handled: a flat list of slot blocks, or a dict whose values are
/// lists of slot blocks (grouped by some internal key we don't need).
fn extract_slot_blocks(body: &Value) -> Result<Vec<Value>, String> {
    let data = body.get("data").ok_or("missing data field")?;
    match data {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => {
            let mut items = Vec::new();
            for value in map.values() {
                if let Value::Array(nested) = value {
                    items.extend(nested.clone());
                }
            }
            Ok(items)
        }
        Value::Null => Ok(Vec::new()),
        _ => Err("unexpected shape for data field".to_string()),
    }
}

fn slot_from_block(block: &Value, raw: &RawResponse) -> Result<Slot, String> {
    let formatted_24_hour = block
        .pointer("/starts_at/format_24_hour")
        .and_then(Value::as_str)
        .ok_or("missing starts_at.format_24_hour")?;
    let starting_time = NaiveTime::parse_from_str(formatted_24_hour, "%H:%M")
        .map_err(|error| format!("invalid starting time {formatted_24_hour}: {error}"))?;
    let ending_time = starting_time + Duration::minutes(raw.metadata.duration_minutes);

    let price = block
        .pointer("/price/formatted_amount")
        .and_then(Value::as_str)
        .map(clean_price)
        .or_else(|| raw.metadata.price.clone())
        .unwrap_or_default();

    let spaces = i32::try_from(block.get("spaces").and_then(Value::as_i64).unwrap_or(0))
        .unwrap_or(0);

    Ok(Slot {
        composite_key: raw.metadata.venue.composite_key.clone(),
        category: raw.metadata.category.clone(),
        date: raw.metadata.date,
        starting_time,
        ending_time,
        price,
        spaces,
        booking_url: raw.metadata.booking_url.clone(),
        last_refreshed: None,
    })
}

pub struct BetterTaskCreationStrategy {
    pub placeholders: Arc<dyn PlaceholderLookup>,
}

#[async_trait]
impl TaskCreationStrategy for BetterTaskCreationStrategy {
    async fn fetch_and_transform(
        &self,
        client: &reqwest::Client,
        request: RequestDetail,
    ) -> Result<Vec<Slot>, String> {
        rest_json::fetch_and_transform(client, request, &BetterResponseParser, &self.placeholders).await
    }
}

pub fn build_crawler(placeholders: Arc<dyn PlaceholderLookup>) -> BaseCrawler {
    BaseCrawler {
        organisation_website: ORGANISATION_WEBSITE.to_string(),
        request_strategy: Box::new(BetterRequestStrategy),
        response_parser_strategy: Box::new(BetterResponseParser),
        task_creation_strategy: Box::new(BetterTaskCreationStrategy { placeholders }),
        lookahead_days: LOOKAHEAD_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sport;

    fn venue() -> Venue {
        Venue {
            composite_key: "abcd1234".to_string(),
            organisation: "Better".to_string(),
            organisation_website: ORGANISATION_WEBSITE.to_string(),
            venue_name: "Kings Hall Leisure".to_string(),
            slug: "kings-hall-leisure".to_string(),
            sports: vec![Sport::Badminton],
            postcode: Some("E9 6BG".to_string()),
            address: None,
            latitude: 51.54,
            longitude: -0.055,
        }
    }

    #[test]
    fn generate_request_details_covers_both_activity_variants() {
        let requests = BetterRequestStrategy.generate_request_details(
            &venue(),
            NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            None,
        );
        assert_eq!(requests.len(), 2);
        assert!(requests[0].url.contains("badminton-40min"));
        assert_eq!(requests[0].metadata.duration_minutes, 40);
        assert!(requests[1].url.contains("badminton-60min"));
        assert_eq!(requests[1].metadata.duration_minutes, 60);
    }

    fn raw_response(content_json: Value) -> RawResponse {
        RawResponse {
            content: content_json.to_string(),
            status_code: 200,
            content_type: Some("application/json".to_string()),
            metadata: RequestMetadata {
                category: "badminton".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
                price: None,
                booking_url: Some("https://bookings.better.org.uk/x".to_string()),
                venue: venue(),
                duration_minutes: 60,
            },
        }
    }

    #[test]
    fn parse_accepts_list_shaped_data() {
        let body = serde_json::json!({
            "data": [
                { "starts_at": { "format_24_hour": "18:00" }, "price": { "formatted_amount": "£8.50" }, "spaces": 2 }
            ]
        });
        let slots = BetterResponseParser.parse(&raw_response(body)).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].starting_time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(slots[0].ending_time, NaiveTime::from_hms_opt(19, 0, 0).unwrap());
        assert_eq!(slots[0].spaces, 2);
    }

    #[test]
    fn parse_accepts_dict_of_blocks_shaped_data() {
        let body = serde_json::json!({
            "data": {
                "block-1": [
                    { "starts_at": { "format_24_hour": "19:00" }, "price": { "formatted_amount": "£8.50" }, "spaces": 0 }
                ]
            }
        });
        let slots = BetterResponseParser.parse(&raw_response(body)).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].spaces, 0);
    }

    #[test]
    fn parse_rejects_missing_data_field() {
        let raw = raw_response(serde_json::json!({}));
        assert!(BetterResponseParser.parse(&raw).is_err());
    }
}
