use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Badminton,
    Squash,
    Pickleball,
}

impl Sport {
    pub const ALL: [Sport; 3] = [Sport::Badminton, Sport::Squash, Sport::Pickleball];

    /// Table name this sport's master/staging data lives under.
    pub fn table_name(self) -> &'static str {
        match self {
            Sport::Badminton => "badminton",
            Sport::Squash => "squash",
            Sport::Pickleball => "pickleball",
        }
    }

    /// How many days ahead a refresh should look, per sport. Pickleball
    /// providers in practice publish further out than badminton/squash.
    pub fn default_lookahead_days(self) -> i64 {
        match self {
            Sport::Badminton | Sport::Squash => 10,
            Sport::Pickleball => 15,
        }
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Sport::Badminton => "badminton",
            Sport::Squash => "squash",
            Sport::Pickleball => "pickleball",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Sport {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "badminton" => Ok(Sport::Badminton),
            "squash" => Ok(Sport::Squash),
            "pickleball" => Ok(Sport::Pickleball),
            other => Err(format!("unrecognised sport: {other}")),
        }
    }
}

/// A bookable venue, seeded from the venue mapping file and resolved by
/// composite key everywhere downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub composite_key: String,
    pub organisation: String,
    pub organisation_website: String,
    pub venue_name: String,
    pub slug: String,
    pub sports: Vec<Sport>,
    pub postcode: Option<String>,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Venue {
    pub fn offers(&self, sport: Sport) -> bool {
        self.sports.contains(&sport)
    }
}

/// `md5(organisation_website + "|" + slug)[:8]` — the deterministic venue
/// identifier used across the catalogue, staged datasets and query layer.
pub fn generate_composite_key(organisation_website: &str, slug: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(organisation_website.as_bytes());
    hasher.update(b"|");
    hasher.update(slug.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..8].to_string()
}
