use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::crawler::adapters::PlaceholderLookup;
use crate::crawler::normalise::clean_price;
use crate::crawler::{
    BaseCrawler, RawResponse, RequestDetail, RequestMetadata, RequestStrategy,
    ResponseParserStrategy, TaskCreationStrategy,
};
use crate::models::{Slot, Venue};

pub const ORGANISATION_WEBSITE: &str = "https://southwarkleisure.gll.org";
const LOOKAHEAD_DAYS: i64 = 10;
const LOGIN_URL: &str = "https://southwarkleisure.gll.org/book";

pub struct SouthwarkLeisureRequestStrategy;

impl RequestStrategy for SouthwarkLeisureRequestStrategy {
    fn generate_request_details(
        &self,
        venue: &Venue,
        fetch_date: NaiveDate,
        token: Option<&str>,
    ) -> Vec<RequestDetail> {
        let url = format!(
            "https://southwarkleisure.gll.org/api/activities/venue/{}/activity/pickleball/times?date={fetch_date}",
            venue.slug
        );
        let mut headers = HashMap::new();
        if let Some(token) = token {
            headers.insert("authorization".to_string(), format!("Bearer {token}"));
        }

        vec![RequestDetail {
            url,
            headers,
            payload: None,
            metadata: RequestMetadata {
                category: "pickleball".to_string(),
                date: fetch_date,
                price: None,
                booking_url: None,
                venue: venue.clone(),
                duration_minutes: 60,
            },
        }]
    }
}

pub struct SouthwarkLeisureResponseParser;

impl ResponseParserStrategy for SouthwarkLeisureResponseParser {
    fn parse(&self, raw: &RawResponse) -> Result<Vec<Slot>, String> {
        let body: Value =
            serde_json::from_str(&raw.content).map_err(|error| format!("invalid JSON: {error}"))?;
        let data = body.get("data").and_then(Value::as_array).ok_or("missing data array")?;

        data.iter()
            .map(|block| {
                let start = block.get("start").and_then(Value::as_str).ok_or("missing start")?;
                let end = block.get("end").and_then(Value::as_str).ok_or("missing end")?;
                let starting_time = NaiveTime::parse_from_str(start, "%H:%M")
                    .map_err(|error| format!("invalid start time {start}: {error}"))?;
                let ending_time = NaiveTime::parse_from_str(end, "%H:%M")
                    .map_err(|error| format!("invalid end time {end}: {error}"))?;
                let spaces = i32::try_from(block.get("spaces").and_then(Value::as_i64).unwrap_or(0))
                    .unwrap_or(0);
                let price = block
                    .get("price")
                    .and_then(Value::as_str)
                    .map(clean_price)
                    .unwrap_or_default();

                Ok(Slot {
                    composite_key: raw.metadata.venue.composite_key.clone(),
                    category: raw.metadata.category.clone(),
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

pub struct SouthwarkLeisureTaskCreationStrategy {
    webdriver_url: String,
    token: Mutex<Option<String>>,
}

impl SouthwarkLeisureTaskCreationStrategy {
    pub fn new(webdriver_url: String) -> Self {
        Self {
            webdriver_url,
            token: Mutex::new(None),
        }
    }

    async fn authorization_token(&self) -> Result<String, String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = acquire_token(&self.webdriver_url).await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    async fn refresh_token(&self) -> Result<String, String> {
        let token = acquire_token(&self.webdriver_url).await?;
        *self.token.lock().await = Some(token.clone());
        Ok(token)
    }
}

async fn acquire_token(webdriver_url: &str) -> Result<String, String> {
    let client = fantoccini::ClientBuilder::native()
        .connect(webdriver_url)
        .await
        .map_err(|error| format!("failed to connect to webdriver at {webdriver_url}: {error}"))?;

    let result = async {
        client
            .goto(LOGIN_URL)
            .await
            .map_err(|error| format!("failed to navigate to {LOGIN_URL}: {error}"))?;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let cookies = client
            .get_all_cookies()
            .await
            .map_err(|error| format!("failed to read cookies: {error}"))?;

        cookies
            .into_iter()
            .find(|cookie| cookie.name() == "jwt")
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| "jwt cookie not present after login".to_string())
    }
    .await;

    if let Err(error) = client.close().await {
        error!(error = %error, "failed to close webdriver session cleanly");
    }

    let token = result?;
    info!("acquired Southwark Leisure authorization token");
    Ok(token)
}

#[async_trait]
impl TaskCreationStrategy for SouthwarkLeisureTaskCreationStrategy {
    async fn fetch_and_transform(
        &self,
        client: &reqwest::Client,
        mut request: RequestDetail,
    ) -> Result<Vec<Slot>, String> {
        let mut token = self.authorization_token().await?;
        let mut refreshed_once = false;

        loop {
            request
                .headers
                .insert("authorization".to_string(), format!("Bearer {token}"));

            let response =
                crate::crawler::adapters::get_with_retry(client, &request.url, &request.headers)
                    .await?;

            if response.status() == reqwest::StatusCode::UNAUTHORIZED && !refreshed_once {
                info!("Southwark Leisure token rejected, refreshing and retrying once");
                token = self.refresh_token().await?;
                refreshed_once = true;
                continue;
            }
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
            return SouthwarkLeisureResponseParser.parse(&raw);
        }
    }
}

pub fn build_crawler(webdriver_url: String, _placeholders: Arc<dyn PlaceholderLookup>) -> BaseCrawler {
    BaseCrawler {
        organisation_website: ORGANISATION_WEBSITE.to_string(),
        request_strategy: Box::new(SouthwarkLeisureRequestStrategy),
        response_parser_strategy: Box::new(SouthwarkLeisureResponseParser),
        task_creation_strategy: Box::new(SouthwarkLeisureTaskCreationStrategy::new(webdriver_url)),
        lookahead_days: LOOKAHEAD_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_spaces_and_price() {
        let venue = Venue {
            composite_key: "sl123456".to_string(),
            organisation: "Southwark Leisure".to_string(),
            organisation_website: ORGANISATION_WEBSITE.to_string(),
            venue_name: "Seven Islands Leisure Centre".to_string(),
            slug: "seven-islands".to_string(),
            sports: vec![crate::models::Sport::Pickleball],
            postcode: None,
            address: None,
            latitude: 51.49,
            longitude: -0.04,
        };
        let body = serde_json::json!({
            "data": [
                { "start": "18:00", "end": "19:00", "spaces": 1, "price": "£6.50" }
            ]
        });
        let raw = RawResponse {
            content: body.to_string(),
            status_code: 200,
            content_type: Some("application/json".to_string()),
            metadata: RequestMetadata {
                category: "pickleball".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
                price: None,
                booking_url: None,
                venue,
                duration_minutes: 60,
            },
        };
        let slots = SouthwarkLeisureResponseParser.parse(&raw).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].price, "£6.50");
    }
}
