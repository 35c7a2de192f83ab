use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::crawler::{filter_allowable_dates, BaseCrawler};
use crate::models::{Slot, Venue};

/// Runs one crawler against one set of venues and dates, fanning out a
/// task per `(venue, date)` pair and collecting whatever slots come back.
/// A failing task is logged and dropped; it never cancels its siblings or
/// fails the invocation, matching the "partial failure is the norm"
/// principle of the crawl orchestrator.
pub async fn crawl(
    crawler: &BaseCrawler,
    client: &reqwest::Client,
    venues: &[Venue],
    requested_dates: &[NaiveDate],
    concurrency_limit: usize,
) -> Vec<Slot> {
    let dates = filter_allowable_dates(requested_dates, crawler.lookahead_days);
    if dates.is_empty() {
        warn!(
            organisation_website = crawler.organisation_website.as_str(),
            "no requested dates fall within this provider's look-ahead window"
        );
        return Vec::new();
    }

    let semaphore = Arc::new(Semaphore::new(concurrency_limit.max(1)));
    let mut handles = Vec::with_capacity(venues.len() * dates.len());

    for venue in venues {
        for &date in &dates {
            let requests = crawler
                .request_strategy
                .generate_request_details(venue, date, None);

            for request in requests {
                let permit = Arc::clone(&semaphore);
                let task_creation_strategy = &crawler.task_creation_strategy;
                let client = client.clone();
                let organisation_website = crawler.organisation_website.clone();
                let composite_key = venue.composite_key.clone();

                let handle = async move {
                    let _permit = permit
                        .acquire_owned()
                        .await
                        .expect("semaphore is never closed during a crawl");
                    task_creation_strategy
                        .fetch_and_transform(&client, request)
                        .await
                        .map_err(|message| {
                            warn!(
                                organisation_website = organisation_website.as_str(),
                                composite_key = composite_key.as_str(),
                                error = message.as_str(),
                                "request failed, dropping"
                            );
                        })
                };
                handles.push(handle);
            }
        }
    }

    // A single join point per invocation, mirroring the original's one
    // `asyncio.gather` call: every task suspends independently on I/O but
    // the orchestrator waits for the whole batch before returning.
    let results = futures::future::join_all(handles).await;

    results
        .into_iter()
        .filter_map(std::result::Result::ok)
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{
        RequestDetail, RequestMetadata, RequestStrategy, ResponseParserStrategy,
        TaskCreationStrategy,
    };
    use crate::models::Sport;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticRequestStrategy;
    impl RequestStrategy for StaticRequestStrategy {
        fn generate_request_details(
            &self,
            venue: &Venue,
            fetch_date: NaiveDate,
            _token: Option<&str>,
        ) -> Vec<RequestDetail> {
            vec![RequestDetail {
                url: format!("https://example.test/{}", venue.slug),
                headers: HashMap::new(),
                payload: None,
                metadata: RequestMetadata {
                    category: "badminton".to_string(),
                    date: fetch_date,
                    price: Some("£8.00".to_string()),
                    booking_url: None,
                    venue: venue.clone(),
                    duration_minutes: 60,
                },
            }]
        }
    }

    struct EchoParser;
    impl ResponseParserStrategy for EchoParser {
        fn parse(&self, _raw: &crate::crawler::RawResponse) -> Result<Vec<Slot>, String> {
            Ok(Vec::new())
        }
    }

    struct FlakyTaskCreationStrategy;
    #[async_trait]
    impl TaskCreationStrategy for FlakyTaskCreationStrategy {
        async fn fetch_and_transform(
            &self,
            _client: &reqwest::Client,
            request: RequestDetail,
        ) -> Result<Vec<Slot>, String> {
            if request.metadata.venue.slug == "fails" {
                return Err("simulated transport failure".to_string());
            }
            Ok(vec![Slot {
                composite_key: request.metadata.venue.composite_key,
                category: request.metadata.category,
                date: request.metadata.date,
                starting_time: chrono::NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                ending_time: chrono::NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                price: "£8.00".to_string(),
                spaces: 2,
                booking_url: None,
                last_refreshed: None,
            }])
        }
    }

    fn venue(slug: &str) -> Venue {
        Venue {
            composite_key: format!("ck-{slug}"),
            organisation: "Test Org".to_string(),
            organisation_website: "https://example.test".to_string(),
            venue_name: slug.to_string(),
            slug: slug.to_string(),
            sports: vec![Sport::Badminton],
            postcode: None,
            address: None,
            latitude: 51.5,
            longitude: -0.1,
        }
    }

    #[tokio::test]
    async fn crawl_drops_failed_tasks_and_keeps_successful_siblings() {
        let crawler = BaseCrawler {
            organisation_website: "https://example.test".to_string(),
            request_strategy: Box::new(StaticRequestStrategy),
            response_parser_strategy: Box::new(EchoParser),
            task_creation_strategy: Box::new(FlakyTaskCreationStrategy),
            lookahead_days: 10,
        };
        let venues = vec![venue("ok"), venue("fails")];
        let dates = vec![crate::crawler::normalise::today_london()];
        let client = reqwest::Client::new();

        let slots = crawl(&crawler, &client, &venues, &dates, 4).await;
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].composite_key, "ck-ok");
    }

    #[tokio::test]
    async fn crawl_returns_empty_when_no_dates_in_window() {
        let crawler = BaseCrawler {
            organisation_website: "https://example.test".to_string(),
            request_strategy: Box::new(StaticRequestStrategy),
            response_parser_strategy: Box::new(EchoParser),
            task_creation_strategy: Box::new(FlakyTaskCreationStrategy),
            lookahead_days: 1,
        };
        let venues = vec![venue("ok")];
        let far_future = crate::crawler::normalise::today_london() + chrono::Duration::days(100);
        let client = reqwest::Client::new();

        let slots = crawl(&crawler, &client, &venues, &[far_future], 4).await;
        assert!(slots.is_empty());
    }
}
