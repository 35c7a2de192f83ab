use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::crawler::adapters::PlaceholderLookup;
use crate::crawler::normalise::{rollup_by_interval, to_london_local};
use crate::crawler::{
    BaseCrawler, RawResponse, RequestDetail, RequestMetadata, RequestStrategy,
    ResponseParserStrategy, TaskCreationStrategy,
};
use crate::models::{Slot, Venue};

pub const ORGANISATION_WEBSITE: &str = "https://towerhamletscouncil.gladstonego.cloud";
const LOOKAHEAD_DAYS: i64 = 10;
const LOGIN_URL: &str = "https://towerhamletscouncil.gladstonego.cloud/book";

pub struct TowerHamletsRequestStrategy;

impl RequestStrategy for TowerHamletsRequestStrategy {
    fn generate_request_details(
        &self,
        venue: &Venue,
        fetch_date: NaiveDate,
        token: Option<&str>,
    ) -> Vec<RequestDetail> {
        let url = format!(
            "https://towerhamletscouncil.gladstonego.cloud/api/availability/{}?date={fetch_date}",
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

pub struct TowerHamletsResponseParser;

impl ResponseParserStrategy for TowerHamletsResponseParser {
    fn parse(&self, raw: &RawResponse) -> Result<Vec<Slot>, String> {
        let body: Value =
            serde_json::from_str(&raw.content).map_err(|error| format!("invalid JSON: {error}"))?;
        let locations = body.get("locations").and_then(Value::as_array).ok_or("missing locations array")?;

        let mut rows = Vec::new();
        for location in locations {
            let bookable_items = location
                .get("bookableItems")
                .and_then(Value::as_array)
                .ok_or("missing bookableItems array")?;
            for item in bookable_items {
                let slots = item.get("slots").and_then(Value::as_array).ok_or("missing slots array")?;
                for slot in slots {
                    let start_epoch = slot
                        .get("startTime")
                        .and_then(Value::as_i64)
                        .ok_or("missing startTime")?;
                    let end_epoch = slot
                        .get("endTime")
                        .and_then(Value::as_i64)
                        .ok_or("missing endTime")?;
                    let status = slot.get("status").and_then(Value::as_str).unwrap_or("");

                    let (_, starting_time) =
                        to_london_local(start_epoch).ok_or("invalid startTime epoch")?;
                    let (_, ending_time) = to_london_local(end_epoch).ok_or("invalid endTime epoch")?;
                    let available = i32::from(status == "Available");
                    rows.push((starting_time, ending_time, available));
                }
            }
        }

        let rolled = rollup_by_interval(rows);
        Ok(rolled
            .into_iter()
            .map(|(starting_time, ending_time, spaces)| Slot {
                composite_key: raw.metadata.venue.composite_key.clone(),
                category: raw.metadata.category.clone(),
                date: raw.metadata.date,
                starting_time,
                ending_time,
                price: raw.metadata.price.clone().unwrap_or_default(),
                spaces,
                booking_url: Some(format!(
                    "https://towerhamletscouncil.gladstonego.cloud/book/{}/{}",
                    raw.metadata.venue.slug, raw.metadata.date
                )),
                last_refreshed: None,
            })
            .collect())
    }
}

/// Drives a one-shot headless-browser login via a webdriver session the
/// first time this strategy is used in a pipeline invocation, then reuses
/// the cached bearer token for every subsequent request it builds.
pub struct TowerHamletsTaskCreationStrategy {
    webdriver_url: String,
    token: Mutex<Option<String>>,
}

impl TowerHamletsTaskCreationStrategy {
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

    /// Drops the cached token and logs in again. Called once after a 401
    /// so a session that expired mid-run doesn't fail every remaining
    /// request for this adapter.
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
    info!("acquired Tower Hamlets authorization token");
    Ok(token)
}

#[async_trait]
impl TaskCreationStrategy for TowerHamletsTaskCreationStrategy {
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
                info!("Tower Hamlets token rejected, refreshing and retrying once");
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
            return TowerHamletsResponseParser.parse(&raw);
        }
    }
}

pub fn build_crawler(webdriver_url: String, _placeholders: Arc<dyn PlaceholderLookup>) -> BaseCrawler {
    BaseCrawler {
        organisation_website: ORGANISATION_WEBSITE.to_string(),
        request_strategy: Box::new(TowerHamletsRequestStrategy),
        response_parser_strategy: Box::new(TowerHamletsResponseParser),
        task_creation_strategy: Box::new(TowerHamletsTaskCreationStrategy::new(webdriver_url)),
        lookahead_days: LOOKAHEAD_DAYS,
    }
}
