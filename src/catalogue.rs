use serde::Deserialize;
use tokio_postgres::Client;
use tracing::info;

use crate::error::{AggregatorError, Result};
use crate::models::venue::generate_composite_key;
use crate::models::{Sport, Venue};

/// Mirrors the hierarchical venue mapping file's JSON shape:
/// `[{ organisation, organisation_website, venues: [{ venue_name, slug,
/// sports, location: { postcode, address, latitude, longitude } }] }]`.
#[derive(Debug, Deserialize)]
struct OrganisationEntry {
    organisation: String,
    organisation_website: String,
    venues: Vec<VenueEntry>,
}

#[derive(Debug, Deserialize)]
struct VenueEntry {
    venue_name: String,
    slug: String,
    sports: Vec<String>,
    location: LocationEntry,
}

#[derive(Debug, Deserialize)]
struct LocationEntry {
    postcode: Option<String>,
    address: Option<String>,
    latitude: f64,
    longitude: f64,
}

/// Reads the venue mapping file from disk and validates it into `Venue`
/// rows, deriving each venue's composite key along the way. The entire
/// file is rejected on the first invalid row — a partially-loaded
/// catalogue is worse than refusing to start.
pub fn load_venues_from_file(path: &str) -> Result<Vec<Venue>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|error| AggregatorError::Config(format!("failed to read {path}: {error}")))?;
    parse_venue_mapping(&raw)
}

fn parse_venue_mapping(raw: &str) -> Result<Vec<Venue>> {
    let organisations: Vec<OrganisationEntry> = serde_json::from_str(raw)
        .map_err(|error| AggregatorError::Config(format!("invalid venue mapping file: {error}")))?;

    let mut venues = Vec::new();
    for organisation in organisations {
        for venue_entry in organisation.venues {
            let sports = venue_entry
                .sports
                .iter()
                .map(|name| {
                    name.parse::<Sport>().map_err(|_| {
                        AggregatorError::Config(format!(
                            "venue {} declares unrecognised sport {name}",
                            venue_entry.slug
                        ))
                    })
                })
                .collect::<Result<Vec<Sport>>>()?;

            if sports.is_empty() {
                return Err(AggregatorError::Config(format!(
                    "venue {} declares no sports",
                    venue_entry.slug
                )));
            }
            if !(-90.0..=90.0).contains(&venue_entry.location.latitude)
                || !(-180.0..=180.0).contains(&venue_entry.location.longitude)
            {
                return Err(AggregatorError::Config(format!(
                    "venue {} has out-of-range coordinates",
                    venue_entry.slug
                )));
            }

            let composite_key =
                generate_composite_key(&organisation.organisation_website, &venue_entry.slug);

            venues.push(Venue {
                composite_key,
                organisation: organisation.organisation.clone(),
                organisation_website: organisation.organisation_website.clone(),
                venue_name: venue_entry.venue_name,
                slug: venue_entry.slug,
                sports,
                postcode: venue_entry.location.postcode,
                address: venue_entry.location.address,
                latitude: venue_entry.location.latitude,
                longitude: venue_entry.location.longitude,
            });
        }
    }

    Ok(venues)
}

/// Truncates and reloads the `public.sportsvenue` table from the mapping
/// file under one transaction, so a reader never sees a partially-loaded
/// catalogue.
pub async fn reload_venue_catalogue(client: &mut Client, venues: &[Venue]) -> Result<()> {
    let transaction = client.transaction().await?;
    transaction
        .execute("TRUNCATE TABLE public.sportsvenue", &[])
        .await?;

    for venue in venues {
        let sports: Vec<String> = venue.sports.iter().map(ToString::to_string).collect();
        transaction
            .execute(
                "INSERT INTO public.sportsvenue
                    (composite_key, organisation, organisation_website, venue_name, slug,
                     sports, postcode, address, latitude, longitude)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
                &[
                    &venue.composite_key,
                    &venue.organisation,
                    &venue.organisation_website,
                    &venue.venue_name,
                    &venue.slug,
                    &sports,
                    &venue.postcode,
                    &venue.address,
                    &venue.latitude,
                    &venue.longitude,
                ],
            )
            .await?;
    }

    transaction.commit().await?;
    info!(venue_count = venues.len(), "reloaded venue catalogue");
    Ok(())
}

const VENUE_COLUMNS: &str = "composite_key, organisation, organisation_website, venue_name, slug,
                    sports, postcode, address, latitude, longitude";

fn row_to_venue(row: &tokio_postgres::Row) -> Venue {
    let sports: Vec<String> = row.get("sports");
    Venue {
        composite_key: row.get("composite_key"),
        organisation: row.get("organisation"),
        organisation_website: row.get("organisation_website"),
        venue_name: row.get("venue_name"),
        slug: row.get("slug"),
        sports: sports
            .iter()
            .filter_map(|name| name.parse::<Sport>().ok())
            .collect(),
        postcode: row.get("postcode"),
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
    }
}

/// Returns every venue offering the given sport, for use by the crawl
/// orchestrator. The `ListOfferingSport` member of the catalogue's
/// exposed contract (spec.md §4.A).
pub async fn venues_by_sport(client: &Client, sport: Sport) -> Result<Vec<Venue>> {
    let rows = client
        .query(
            &format!("SELECT {VENUE_COLUMNS} FROM public.sportsvenue WHERE $1 = ANY(sports)"),
            &[&sport.to_string()],
        )
        .await?;
    Ok(rows.iter().map(row_to_venue).collect())
}

/// Returns every venue in the catalogue, regardless of sport. The
/// `ListAll` member of the catalogue's exposed contract (spec.md §4.A).
pub async fn list_all(client: &Client) -> Result<Vec<Venue>> {
    let rows = client
        .query(&format!("SELECT {VENUE_COLUMNS} FROM public.sportsvenue"), &[])
        .await?;
    Ok(rows.iter().map(row_to_venue).collect())
}

/// Looks up one venue by its composite key, or `None` if no venue has it.
/// The `Lookup` member of the catalogue's exposed contract (spec.md §4.A).
pub async fn lookup(client: &Client, composite_key: &str) -> Result<Option<Venue>> {
    let rows = client
        .query(
            &format!("SELECT {VENUE_COLUMNS} FROM public.sportsvenue WHERE composite_key = $1"),
            &[&composite_key],
        )
        .await?;
    Ok(rows.first().map(row_to_venue))
}

/// Returns every venue within `radius_miles` of `(lat, lon)`, paired with
/// its great-circle distance in miles, sorted ascending by distance. The
/// `WithinRadius` member of the catalogue's exposed contract (spec.md
/// §4.A) — implemented with the haversine formula in the query layer per
/// spec.md's "or the equivalent haversine" fallback, since no PostGIS
/// geography function is assumed here.
pub async fn within_radius(
    client: &Client,
    lat: f64,
    lon: f64,
    radius_miles: f64,
) -> Result<Vec<(Venue, f64)>> {
    const KM_PER_MILE: f64 = 1.609_344;

    let mut venues: Vec<(Venue, f64)> = list_all(client)
        .await?
        .into_iter()
        .map(|venue| {
            let distance_km =
                crate::query::haversine_distance_km((lat, lon), (venue.latitude, venue.longitude));
            (venue, distance_km / KM_PER_MILE)
        })
        .filter(|(_, distance_miles)| *distance_miles <= radius_miles)
        .collect();

    venues.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    Ok(venues)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    [
        {
            "organisation": "Better",
            "organisation_website": "https://www.better.org.uk",
            "venues": [
                {
                    "venue_name": "Kings Hall Leisure",
                    "slug": "kings-hall-leisure",
                    "sports": ["badminton"],
                    "location": { "postcode": "E9 6BG", "address": null, "latitude": 51.54, "longitude": -0.055 }
                }
            ]
        }
    ]
    "#;

    #[test]
    fn parse_venue_mapping_derives_composite_key() {
        let venues = parse_venue_mapping(SAMPLE).unwrap();
        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].composite_key.len(), 8);
        assert_eq!(venues[0].sports, vec![Sport::Badminton]);
    }

    #[test]
    fn parse_venue_mapping_rejects_unknown_sport() {
        let bad = SAMPLE.replace("badminton", "croquet");
        assert!(parse_venue_mapping(&bad).is_err());
    }

    #[test]
    fn parse_venue_mapping_rejects_out_of_range_coordinates() {
        let bad = SAMPLE.replace("51.54", "9999");
        assert!(parse_venue_mapping(&bad).is_err());
    }
}
