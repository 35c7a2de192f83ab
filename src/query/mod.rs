//! The query layer backing `Search`/`SearchVenue`. The public REST API
//! that would expose these over HTTP is an external interface and out of
//! scope here; this module is what that interface would call into.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime, Utc};
use tokio_postgres::Client;

use crate::error::Result;
use crate::models::{Slot, Sport, Venue};

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance between two lat/lng points, in kilometres.
pub fn haversine_distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lng1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lng2) = (b.0.to_radians(), b.1.to_radians());
    let delta_lat = lat2 - lat1;
    let delta_lng = lng2 - lng1;

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Price,
    Distance,
}

/// One grouped, ranked result row: the anchor slot (first available
/// interval for the day) plus every other interval at that venue/date as
/// `other_availabilities`.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub composite_key: String,
    pub venue_name: String,
    pub address: Option<String>,
    pub distance_km: f64,
    pub date: NaiveDate,
    pub price: String,
    pub availabilities: Vec<AvailabilityEntry>,
}

#[derive(Debug, Clone)]
pub struct AvailabilityEntry {
    pub starting_time: chrono::NaiveTime,
    pub ending_time: chrono::NaiveTime,
    pub available: bool,
    pub booking_url: Option<String>,
    pub price: String,
}

/// Finds the venue set this search should run against: either the caller's
/// explicit `specified_venues` (by composite key, looked up directly — an
/// empty list here means zero groups, never "fall back to all venues"), or
/// every venue offering `sport` within `radius_km` of `origin`.
async fn resolve_venue_set(
    client: &Client,
    sport: Sport,
    origin: (f64, f64),
    radius_km: f64,
    specified_venues: Option<&[String]>,
) -> Result<Vec<(Venue, f64)>> {
    if let Some(keys) = specified_venues {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let venues = crate::catalogue::venues_by_sport(client, sport).await?;
        return Ok(venues
            .into_iter()
            .filter(|venue| keys.contains(&venue.composite_key))
            .map(|venue| {
                let distance = haversine_distance_km(origin, (venue.latitude, venue.longitude));
                (venue, distance)
            })
            .collect());
    }

    let venues = crate::catalogue::venues_by_sport(client, sport).await?;
    Ok(venues
        .into_iter()
        .map(|venue| {
            let distance = haversine_distance_km(origin, (venue.latitude, venue.longitude));
            (venue, distance)
        })
        .filter(|(_, distance)| *distance <= radius_km)
        .collect())
}

/// Finds venues offering `sport` within `radius_km` of `origin` (or the
/// caller's `specified_venues`, if given), then searches each for
/// availability on `dates` within `[start_time, end_time)`, grouped and
/// sorted per the query layer's ranking algorithm. An explicit empty
/// `specified_venues` returns zero groups rather than widening to a
/// radius search.
#[allow(clippy::too_many_arguments)]
pub async fn search(
    client: &Client,
    sport: Sport,
    origin: (f64, f64),
    radius_km: f64,
    dates: &[NaiveDate],
    start_time: NaiveTime,
    end_time: NaiveTime,
    specified_venues: Option<&[String]>,
    sort_by: SortBy,
) -> Result<Vec<SearchResult>> {
    let in_radius = resolve_venue_set(client, sport, origin, radius_km, specified_venues).await?;

    if in_radius.is_empty() {
        return Ok(Vec::new());
    }

    let composite_keys: Vec<String> = in_radius.iter().map(|(v, _)| v.composite_key.clone()).collect();
    let distances: std::collections::HashMap<String, f64> = in_radius
        .iter()
        .map(|(v, distance)| (v.composite_key.clone(), *distance))
        .collect();
    let venue_by_key: std::collections::HashMap<String, Venue> = in_radius
        .into_iter()
        .map(|(v, _)| (v.composite_key.clone(), v))
        .collect();

    let slots =
        fetch_future_slots(client, sport, &composite_keys, dates, start_time, end_time).await?;
    Ok(group_and_rank(&slots, &venue_by_key, &distances, sort_by))
}

/// Returns availability at one already-known venue, without a radius
/// filter — the `SearchVenue` contract.
pub async fn search_venue(
    client: &Client,
    sport: Sport,
    composite_key: &str,
    dates: &[NaiveDate],
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<Vec<SearchResult>> {
    let venues = crate::catalogue::venues_by_sport(client, sport).await?;
    let venue = venues
        .into_iter()
        .find(|venue| venue.composite_key == composite_key);
    let Some(venue) = venue else {
        return Ok(Vec::new());
    };

    let slots = fetch_future_slots(
        client,
        sport,
        std::slice::from_ref(&composite_key.to_string()),
        dates,
        start_time,
        end_time,
    )
    .await?;
    let venue_by_key = std::collections::HashMap::from([(composite_key.to_string(), venue)]);
    let distances = std::collections::HashMap::from([(composite_key.to_string(), 0.0)]);
    Ok(group_and_rank(&slots, &venue_by_key, &distances, SortBy::Price))
}

async fn fetch_future_slots(
    client: &Client,
    sport: Sport,
    composite_keys: &[String],
    dates: &[NaiveDate],
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<Vec<Slot>> {
    let table = sport.table_name();
    let now = Utc::now().naive_utc();
    let rows = client
        .query(
            &format!(
                "SELECT composite_key, category, date, starting_time, ending_time, price, spaces,
                        booking_url, last_refreshed
                 FROM public.{table}
                 WHERE composite_key = ANY($1)
                   AND date = ANY($2)
                   AND spaces > 0
                   AND starting_time >= $3
                   AND ending_time <= $4
                   AND (date + starting_time) > $5"
            ),
            &[&composite_keys, &dates, &start_time, &end_time, &now],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| Slot {
            composite_key: row.get("composite_key"),
            category: row.get("category"),
            date: row.get("date"),
            starting_time: row.get("starting_time"),
            ending_time: row.get("ending_time"),
            price: row.get("price"),
            spaces: row.get("spaces"),
            booking_url: row.get("booking_url"),
            last_refreshed: row.get("last_refreshed"),
        })
        .collect())
}

/// Groups slots by `(composite_key, date)`, anchors on the first slot
/// with `spaces > 0` (skipping the group entirely if none has
/// availability), and sorts the resulting rows by `(date, sort_by)`.
pub fn group_and_rank(
    slots: &[Slot],
    venues: &std::collections::HashMap<String, Venue>,
    distances: &std::collections::HashMap<String, f64>,
    sort_by: SortBy,
) -> Vec<SearchResult> {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<(String, NaiveDate), Vec<&Slot>> = BTreeMap::new();
    for slot in slots {
        groups
            .entry((slot.composite_key.clone(), slot.date))
            .or_default()
            .push(slot);
    }

    let mut results = Vec::new();
    for ((composite_key, date), mut group) in groups {
        group.sort_by_key(|slot| slot.starting_time);

        let Some(anchor) = group.iter().find(|slot| slot.is_available()) else {
            continue;
        };

        let Some(venue) = venues.get(&composite_key) else {
            continue;
        };

        let availabilities = group
            .iter()
            .map(|slot| AvailabilityEntry {
                starting_time: slot.starting_time,
                ending_time: slot.ending_time,
                available: slot.is_available(),
                booking_url: slot.booking_url.clone(),
                price: slot.price.clone(),
            })
            .collect();

        results.push(SearchResult {
            composite_key: composite_key.clone(),
            venue_name: venue.venue_name.clone(),
            address: venue.address.clone(),
            distance_km: distances.get(&composite_key).copied().unwrap_or(99.0),
            date,
            price: anchor.price.clone(),
            availabilities,
        });
    }

    results.sort_by(|a, b| {
        a.date.cmp(&b.date).then_with(|| match sort_by {
            SortBy::Price => numeric_price(&a.price)
                .partial_cmp(&numeric_price(&b.price))
                .unwrap_or(std::cmp::Ordering::Equal),
            SortBy::Distance => a
                .distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal),
        })
    });

    results
}

fn numeric_price(price: &str) -> f64 {
    price
        .trim_start_matches('£')
        .trim()
        .parse::<f64>()
        .unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn haversine_distance_is_zero_for_identical_points() {
        let distance = haversine_distance_km((51.5, -0.1), (51.5, -0.1));
        assert!(distance.abs() < 1e-9);
    }

    #[test]
    fn haversine_distance_matches_known_london_pair() {
        // Trafalgar Square to Kings Cross is roughly 3.3km.
        let distance = haversine_distance_km((51.5080, -0.1281), (51.5308, -0.1238));
        assert!((2.0..4.5).contains(&distance), "got {distance}");
    }

    fn slot(composite_key: &str, date: NaiveDate, hour: u32, spaces: i32, price: &str) -> Slot {
        Slot {
            composite_key: composite_key.to_string(),
            category: "badminton".to_string(),
            date,
            starting_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            ending_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
            price: price.to_string(),
            spaces,
            booking_url: None,
            last_refreshed: None,
        }
    }

    fn venue(composite_key: &str, name: &str) -> Venue {
        Venue {
            composite_key: composite_key.to_string(),
            organisation: "Org".to_string(),
            organisation_website: "https://example.test".to_string(),
            venue_name: name.to_string(),
            slug: name.to_lowercase(),
            sports: vec![Sport::Badminton],
            postcode: None,
            address: None,
            latitude: 51.5,
            longitude: -0.1,
        }
    }

    #[test]
    fn group_and_rank_skips_groups_with_no_availability() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let slots = vec![slot("a", date, 18, 0, "£8.00")];
        let venues = std::collections::HashMap::from([("a".to_string(), venue("a", "A"))]);
        let distances = std::collections::HashMap::from([("a".to_string(), 1.0)]);
        let results = group_and_rank(&slots, &venues, &distances, SortBy::Price);
        assert!(results.is_empty());
    }

    #[test]
    fn group_and_rank_anchors_on_first_available_slot() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let slots = vec![
            slot("a", date, 18, 0, "£8.00"),
            slot("a", date, 19, 2, "£9.00"),
        ];
        let venues = std::collections::HashMap::from([("a".to_string(), venue("a", "A"))]);
        let distances = std::collections::HashMap::from([("a".to_string(), 1.0)]);
        let results = group_and_rank(&slots, &venues, &distances, SortBy::Price);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].price, "£9.00");
        assert_eq!(results[0].availabilities.len(), 2);
    }

    #[test]
    fn group_and_rank_sorts_by_distance_within_same_date() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let slots = vec![
            slot("far", date, 18, 1, "£8.00"),
            slot("near", date, 18, 1, "£8.00"),
        ];
        let venues = std::collections::HashMap::from([
            ("far".to_string(), venue("far", "Far")),
            ("near".to_string(), venue("near", "Near")),
        ]);
        let distances = std::collections::HashMap::from([
            ("far".to_string(), 5.0),
            ("near".to_string(), 1.0),
        ]);
        let results = group_and_rank(&slots, &venues, &distances, SortBy::Distance);
        assert_eq!(results[0].composite_key, "near");
        assert_eq!(results[1].composite_key, "far");
    }
}
