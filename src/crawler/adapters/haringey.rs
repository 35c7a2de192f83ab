use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use scraper::{Html, Selector};

use crate::crawler::adapters::PlaceholderLookup;
use crate::crawler::normalise::{clean_price, rollup_by_interval};
use crate::crawler::{
    BaseCrawler, RawResponse, RequestDetail, RequestMetadata, RequestStrategy,
    ResponseParserStrategy, TaskCreationStrategy,
};
use crate::models::{Slot, Venue};

pub const ORGANISATION_WEBSITE: &str = "https://better.org.uk/leisure-centre/london/haringey";
const LOOKAHEAD_DAYS: i64 = 10;

pub struct HaringeyRequestStrategy;

impl RequestStrategy for HaringeyRequestStrategy {
    fn generate_request_details(
        &self,
        venue: &Venue,
        fetch_date: NaiveDate,
        _token: Option<&str>,
    ) -> Vec<RequestDetail> {
        let url = format!(
            "https://better.org.uk/timetable/{}/badminton?date={fetch_date}",
            venue.slug
        );
        let mut headers = HashMap::new();
        headers.insert("user-agent".to_string(), "sportscanner/0.1".to_string());

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

/// Walks a per-court availability table: one `<tr>` per court, one
/// `<td class="available">` per bookable interval, the cell text holding
/// `HH:MM - HH:MM` and an adjacent `<span class="price">` holding the
/// price.
pub struct HaringeyResponseParser;

impl ResponseParserStrategy for HaringeyResponseParser {
    fn parse(&self, raw: &RawResponse) -> Result<Vec<Slot>, String> {
        let document = Html::parse_document(&raw.content);
        let row_selector = Selector::parse("tr.court-row")
            .map_err(|error| format!("invalid selector: {error:?}"))?;
        let cell_selector = Selector::parse("td.available")
            .map_err(|error| format!("invalid selector: {error:?}"))?;
        let price_selector =
            Selector::parse("span.price").map_err(|error| format!("invalid selector: {error:?}"))?;

        let mut rows = Vec::new();
        let mut price = None;

        for court_row in document.select(&row_selector) {
            for cell in court_row.select(&cell_selector) {
                let text = leading_text(cell);
                let (start, end) = parse_interval_text(&text)?;

                if price.is_none() {
                    price = cell
                        .select(&price_selector)
                        .next()
                        .map(|element| clean_price(&element.text().collect::<String>()));
                }

                rows.push((start, end, 1));
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
                price: price.clone().unwrap_or_default(),
                spaces,
                booking_url: None,
                last_refreshed: None,
            })
            .collect())
    }
}

/// The interval text sits as the cell's own text node, before the nested
/// `<span class="price">` — collecting `cell.text()` directly pulls the
/// price text in too, so this stops at the first child element instead.
fn leading_text(cell: scraper::ElementRef<'_>) -> String {
    cell.children()
        .take_while(|node| !node.value().is_element())
        .filter_map(|node| node.value().as_text().map(|text| text.to_string()))
        .collect()
}

fn parse_interval_text(text: &str) -> Result<(NaiveTime, NaiveTime), String> {
    let mut parts = text.trim().split('-').map(str::trim);
    let start = parts.next().ok_or("missing start time in cell text")?;
    let end = parts.next().ok_or("missing end time in cell text")?;
    let start = NaiveTime::parse_from_str(start, "%H:%M")
        .map_err(|error| format!("invalid start time {start}: {error}"))?;
    let end = NaiveTime::parse_from_str(end, "%H:%M")
        .map_err(|error| format!("invalid end time {end}: {error}"))?;
    Ok((start, end))
}

pub struct HaringeyTaskCreationStrategy;

#[async_trait]
impl TaskCreationStrategy for HaringeyTaskCreationStrategy {
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
            content_type: Some("text/html".to_string()),
            metadata: request.metadata,
        };
        HaringeyResponseParser.parse(&raw)
    }
}

pub fn build_crawler(_placeholders: Arc<dyn PlaceholderLookup>) -> BaseCrawler {
    BaseCrawler {
        organisation_website: ORGANISATION_WEBSITE.to_string(),
        request_strategy: Box::new(HaringeyRequestStrategy),
        response_parser_strategy: Box::new(HaringeyResponseParser),
        task_creation_strategy: Box::new(HaringeyTaskCreationStrategy),
        lookahead_days: LOOKAHEAD_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(html: &str) -> RawResponse {
        RawResponse {
            content: html.to_string(),
            status_code: 200,
            content_type: Some("text/html".to_string()),
            metadata: RequestMetadata {
                category: "badminton".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
                price: None,
                booking_url: None,
                venue: Venue {
                    composite_key: "hg123456".to_string(),
                    organisation: "Haringey".to_string(),
                    organisation_website: ORGANISATION_WEBSITE.to_string(),
                    venue_name: "New River Sport and Community Centre".to_string(),
                    slug: "new-river".to_string(),
                    sports: vec![crate::models::Sport::Badminton],
                    postcode: None,
                    address: None,
                    latitude: 51.58,
                    longitude: -0.1,
                },
                duration_minutes: 60,
            },
        }
    }

    #[test]
    fn parse_rolls_up_two_courts_sharing_an_interval() {
        let html = r#"
            <table>
                <tr class="court-row">
                    <td class="available">18:00 - 19:00<span class="price">£8.00</span></td>
                </tr>
                <tr class="court-row">
                    <td class="available">18:00 - 19:00<span class="price">£8.00</span></td>
                </tr>
            </table>
        "#;
        let slots = HaringeyResponseParser.parse(&raw(html)).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].spaces, 2);
        assert_eq!(slots[0].price, "£8.00");
    }

    #[test]
    fn parse_returns_no_slots_when_no_cells_present() {
        let slots = HaringeyResponseParser.parse(&raw("<table></table>")).unwrap();
        assert!(slots.is_empty());
    }
}
