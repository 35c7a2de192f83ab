use std::sync::Arc;

use chrono::NaiveDate;
use tokio_postgres::Client;
use tracing::info;

use crate::config::Settings;
use crate::crawler::adapters::{activelambeth, better, citysports, decathlon, haringey, southwarkleisure, towerhamlets, PlaceholderLookup};
use crate::crawler::{orchestrator, BaseCrawler};
use crate::error::Result;
use crate::models::{Slot, Sport};
use crate::storage::staging;

/// Looks up the current master table's slots for a venue/date to seed
/// zero-space placeholders, backed by a live database connection.
pub struct DatabasePlaceholderLookup {
    client: Arc<Client>,
}

impl DatabasePlaceholderLookup {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl PlaceholderLookup for DatabasePlaceholderLookup {
    async fn zero_space_slots(
        &self,
        category: &str,
        composite_key: &str,
        date: NaiveDate,
    ) -> Vec<Slot> {
        let table = category;
        let rows = self
            .client
            .query(
                &format!(
                    "SELECT composite_key, category, date, starting_time, ending_time, price, booking_url
                     FROM public.{table}
                     WHERE composite_key = $1 AND date = $2"
                ),
                &[&composite_key, &date],
            )
            .await
            .unwrap_or_default();

        rows.iter()
            .map(|row| Slot {
                composite_key: row.get("composite_key"),
                category: row.get("category"),
                date: row.get("date"),
                starting_time: row.get("starting_time"),
                ending_time: row.get("ending_time"),
                price: row.get("price"),
                spaces: 0,
                booking_url: row.get("booking_url"),
                last_refreshed: None,
            })
            .collect()
    }
}

/// Builds every adapter whose organisation offers `sport`. One crawler
/// fans out to all of its venues internally; this builds the roster the
/// orchestrator runs per invocation.
fn crawlers_for_sport(sport: Sport, placeholders: Arc<dyn PlaceholderLookup>) -> Vec<BaseCrawler> {
    let webdriver_url =
        std::env::var("WEBDRIVER_URL").unwrap_or_else(|_| "http://localhost:4444".to_string());

    match sport {
        Sport::Badminton => vec![
            better::build_crawler(placeholders.clone()),
            citysports::build_crawler(placeholders.clone()),
            towerhamlets::build_crawler(webdriver_url, placeholders),
            haringey::build_crawler(Arc::new(crate::crawler::adapters::NoPlaceholders)),
        ],
        Sport::Squash => vec![activelambeth::build_crawler(placeholders)],
        Sport::Pickleball => vec![
            decathlon::build_crawler(placeholders.clone()),
            southwarkleisure::build_crawler(webdriver_url, placeholders),
        ],
    }
}

/// Runs every adapter registered for `sport` against every venue offering
/// it, for each of `dates`, then stages and swaps the combined result set
/// into `public.<sport>`. Returns the number of slots produced so the CLI
/// can decide whether the overall run succeeded.
pub async fn run_sport_refresh(
    client: &mut Client,
    placeholder_client: Arc<Client>,
    settings: &Settings,
    sport: Sport,
    dates: &[NaiveDate],
) -> Result<usize> {
    let venues = crate::catalogue::venues_by_sport(client, sport).await?;
    let http_client = crate::http_client::build_client(settings)?;
    let placeholders: Arc<dyn PlaceholderLookup> =
        Arc::new(DatabasePlaceholderLookup::new(placeholder_client));

    let crawlers = crawlers_for_sport(sport, placeholders);

    let mut all_slots = Vec::new();
    for crawler in &crawlers {
        let relevant_venues: Vec<_> = venues
            .iter()
            .filter(|venue| venue.organisation_website == crawler.organisation_website)
            .cloned()
            .collect();
        if relevant_venues.is_empty() {
            continue;
        }
        let slots = orchestrator::crawl(
            crawler,
            &http_client,
            &relevant_venues,
            dates,
            settings.http_max_connections,
        )
        .await;
        all_slots.extend(slots);
    }

    info!(sport = %sport, slot_count = all_slots.len(), "refresh pipeline produced slots");
    staging::stage_and_swap(client, sport, &all_slots).await?;
    Ok(all_slots.len())
}
