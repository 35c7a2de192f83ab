use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::crawler::adapters::PlaceholderLookup;
use crate::crawler::{
    BaseCrawler, RawResponse, RequestDetail, RequestMetadata, RequestStrategy,
    ResponseParserStrategy, TaskCreationStrategy,
};
use crate::models::{Slot, Venue};

pub const ORGANISATION_WEBSITE: &str = "https://www.citysportscentres.co.uk";
const LOOKAHEAD_DAYS: i64 = 10;

/// City Sports publishes one site-wide timetable per date covering every
/// venue it operates, rather than one response per venue — so a single
/// request is issued per date and the parser slices out the rows for
/// whichever venue the caller asked about.
pub struct CitySportsRequestStrategy;

impl RequestStrategy for CitySportsRequestStrategy {
    fn generate_request_details(
        &self,
        venue: &Venue,
        fetch_date: NaiveDate,
        _token: Option<&str>,
    ) -> Vec<RequestDetail> {
        let url = format!(
            "https://www.citysportscentres.co.uk/api/timetable?date={fetch_date}"
        );
        vec![RequestDetail {
            url,
            headers: HashMap::new(),
            payload: None,
            metadata: RequestMetadata {
                category: "badminton".to_string(),
                date: fetch_date,
                price: None,
                booking_url: None,
                venue: venue.clone(),
                duration_minutes: 60,
            },
        }]
    }
}

pub struct CitySportsResponseParser;

impl ResponseParserStrategy for CitySportsResponseParser {
    fn parse(&self, raw: &RawResponse) -> Result<Vec<Slot>, String> {
        let body: Value =
            serde_json::from_str(&raw.content).map_err(|error| format!("invalid JSON: {error}"))?;
        let venues = body.get("venues").and_then(Value::as_array).ok_or("missing venues array")?;

        let our_venue = venues
            .iter()
            .find(|entry| {
                entry.get("slug").and_then(Value::as_str) == Some(raw.metadata.venue.slug.as_str())
            })
            .ok_or("venue not present in site-wide timetable")?;

        let sessions = our_venue
            .get("sessions")
            .and_then(Value::as_array)
            .ok_or("missing sessions array")?;

        sessions
            .iter()
            .filter(|session| {
                session.get("activity").and_then(Value::as_str) == Some("badminton")
            })
            .map(|session| {
                let start = session
                    .get("start")
                    .and_then(Value::as_str)
                    .ok_or("missing start")?;
                let end = session.get("end").and_then(Value::as_str).ok_or("missing end")?;
                let starting_time = NaiveTime::parse_from_str(start, "%H:%M")
                    .map_err(|error| format!("invalid start time {start}: {error}"))?;
                let ending_time = NaiveTime::parse_from_str(end, "%H:%M")
                    .map_err(|error| format!("invalid end time {end}: {error}"))?;
                let spaces =
                    i32::try_from(session.get("courts_free").and_then(Value::as_i64).unwrap_or(0))
                        .unwrap_or(0);
                let price = session
                    .get("price")
                    .and_then(Value::as_str)
                    .map(crate::crawler::normalise::clean_price)
                    .unwrap_or_default();

                Ok(Slot {
                    composite_key: raw.metadata.venue.composite_key.clone(),
                    category: "badminton".to_string(),
                    date: raw.metadata.date,
                    starting_time,
                    ending_time,
                    price,
                    spaces,
                    booking_url: None,
                    last_refreshed: None,
                })
            })
            .collect()
    }
}

pub struct CitySportsTaskCreationStrategy;

#[async_trait]
impl TaskCreationStrategy for CitySportsTaskCreationStrategy {
    async fn fetch_and_transform(
        &self,
        client: &reqwest::Client,
        request: RequestDetail,
    ) -> Result<Vec<Slot>, String> {
        let response =
            crate::crawler::adapters::get_with_retry(client, &request.url, &request.headers).await?;
        if !response.status().is_success() {
            return Err(format!("non-success status: {}", response.status()));
        }
        let content = response
            .text()
            .await
            .map_err(|error| format!("failed reading response body: {error}"))?;
        let raw = RawResponse {
            content,
            status_code: 200,
            content_type: Some("application/json".to_string()),
            metadata: request.metadata,
        };
        CitySportsResponseParser.parse(&raw)
    }
}

pub fn build_crawler(_placeholders: Arc<dyn PlaceholderLookup>) -> BaseCrawler {
    BaseCrawler {
        organisation_website: ORGANISATION_WEBSITE.to_string(),
        request_strategy: Box::new(CitySportsRequestStrategy),
        response_parser_strategy: Box::new(CitySportsResponseParser),
        task_creation_strategy: Box::new(CitySportsTaskCreationStrategy),
        lookahead_days: LOOKAHEAD_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sport;

    fn venue() -> Venue {
        Venue {
            composite_key: "cs123456".to_string(),
            organisation: "City Sports".to_string(),
            organisation_website: ORGANISATION_WEBSITE.to_string(),
            venue_name: "City Sports Islington".to_string(),
            slug: "islington".to_string(),
            sports: vec![Sport::Badminton],
            postcode: None,
            address: None,
            latitude: 51.53,
            longitude: -0.1,
        }
    }

    #[test]
    fn one_request_per_date_regardless_of_venue() {
        let requests = CitySportsRequestStrategy.generate_request_details(
            &venue(),
            NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            None,
        );
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].url.contains("islington"));
    }

    #[test]
    fn parse_filters_to_requested_venue_and_badminton_only() {
        let body = serde_json::json!({
            "venues": [
                {
                    "slug": "islington",
                    "sessions": [
                        { "activity": "badminton", "start": "18:00", "end": "19:00", "courts_free": 2, "price": "£7.00" },
                        { "activity": "squash", "start": "18:00", "end": "19:00", "courts_free": 1, "price": "£5.00" }
                    ]
                },
                {
                    "slug": "other-venue",
                    "sessions": [
                        { "activity": "badminton", "start": "20:00", "end": "21:00", "courts_free": 3, "price": "£7.00" }
                    ]
                }
            ]
        });
        let raw = RawResponse {
            content: body.to_string(),
            status_code: 200,
            content_type: Some("application/json".to_string()),
            metadata: RequestMetadata {
                category: "badminton".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
                price: None,
                booking_url: None,
                venue: venue(),
                duration_minutes: 60,
            },
        };
        let slots = CitySportsResponseParser.parse(&raw).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].spaces, 2);
    }
}
