use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::crawler::adapters::better::{BetterResponseParser, BetterTaskCreationStrategy};
use crate::crawler::adapters::PlaceholderLookup;
use crate::crawler::{BaseCrawler, RequestDetail, RequestMetadata, RequestStrategy};
use crate::models::Venue;

pub const ORGANISATION_WEBSITE: &str = "https://active.lambeth.gov.uk/";
const LOOKAHEAD_DAYS: i64 = 6;
const ACTIVITY_ID: &str = "squash-court-40min";

/// Active Lambeth exposes the identical "flow.onl" REST shape `better`
/// does, just under a different host and with squash instead of
/// badminton — so this adapter supplies only its own request strategy and
/// reuses Better's response parser and task-creation strategy outright.
pub struct ActiveLambethRequestStrategy;

impl RequestStrategy for ActiveLambethRequestStrategy {
    fn generate_request_details(
        &self,
        venue: &Venue,
        fetch_date: NaiveDate,
        _token: Option<&str>,
    ) -> Vec<RequestDetail> {
        let url = format!(
            "https://flow.onl/api/activities/venue/{}/activity/{ACTIVITY_ID}/times?date={fetch_date}",
            venue.slug
        );
        let booking_url = format!(
            "https://lambethcouncil.bookings.flow.onl/location/{}/{ACTIVITY_ID}/{fetch_date}/by-time/",
            venue.slug
        );
        let mut headers = HashMap::new();
        headers.insert(
            "origin".to_string(),
            "https://lambethcouncil.bookings.flow.onl".to_string(),
        );
        headers.insert(
            "referer".to_string(),
            "https://lambethcouncil.bookings.flow.onl/".to_string(),
        );
        headers.insert(
            "user-agent".to_string(),
            "sportscanner/0.1 (+https://github.com)".to_string(),
        );

        vec![RequestDetail {
            url,
            headers,
            payload: None,
            metadata: RequestMetadata {
                category: "squash".to_string(),
                date: fetch_date,
                price: None,
                booking_url: Some(booking_url),
                venue: venue.clone(),
                duration_minutes: 40,
            },
        }]
    }
}

pub fn build_crawler(placeholders: Arc<dyn PlaceholderLookup>) -> BaseCrawler {
    BaseCrawler {
        organisation_website: ORGANISATION_WEBSITE.to_string(),
        request_strategy: Box::new(ActiveLambethRequestStrategy),
        response_parser_strategy: Box::new(BetterResponseParser),
        task_creation_strategy: Box::new(BetterTaskCreationStrategy { placeholders }),
        lookahead_days: LOOKAHEAD_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sport;

    #[test]
    fn generate_request_details_targets_flow_onl_host() {
        let venue = Venue {
            composite_key: "ck123456".to_string(),
            organisation: "Active Lambeth".to_string(),
            organisation_website: ORGANISATION_WEBSITE.to_string(),
            venue_name: "Brixton Recreation Centre".to_string(),
            slug: "brixton-recreation-centre".to_string(),
            sports: vec![Sport::Squash],
            postcode: Some("SW2 1JQ".to_string()),
            address: None,
            latitude: 51.46,
            longitude: -0.11,
        };
        let requests = ActiveLambethRequestStrategy.generate_request_details(
            &venue,
            NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            None,
        );
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.starts_with("https://flow.onl/"));
        assert_eq!(requests[0].metadata.category, "squash");
    }
}
