use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use sportscanner::config::Settings;
use sportscanner::models::Sport;
use sportscanner::{catalogue, crawler, db, error, pipeline, scheduler, storage};

#[derive(Parser, Debug)]
#[command(name = "sportscanner", version, about = "London sports-court availability aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs the crawl-and-aggregate pipeline once for a sport, or every
    /// sport when `--sport all` is given.
    Run {
        #[arg(long, default_value = "all")]
        sport: String,
    },
    /// Runs the pipeline for every sport on a fixed interval, forever.
    Schedule,
    /// Creates the database schemas/tables and (re)loads the venue
    /// catalogue from the configured mapping file.
    InitDb,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(total_slots) => {
            if total_slots == 0 {
                tracing::error!("pipeline produced zero slots across every sport run, signalling failure");
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            tracing::error!(error = %error, "fatal error");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("ENVIRONMENT").as_deref() {
        Ok("development") | Err(_) => subscriber.init(),
        _ => subscriber.json().init(),
    }
}

async fn run() -> error::Result<usize> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Command::InitDb => {
            let client = db::connect(&settings.database_url).await?;
            storage::ensure_schema(&client).await?;
            let venues = catalogue::load_venues_from_file(&settings.venue_mapping_path)?;
            let mut client = client;
            catalogue::reload_venue_catalogue(&mut client, &venues).await?;
            Ok(venues.len())
        }
        Command::Run { sport } => run_once(&settings, &sport).await,
        Command::Schedule => {
            let scheduler = scheduler::Scheduler::new();
            scheduler
                .run_forever(&settings, |sport| {
                    let settings = settings.clone();
                    async move { run_once(&settings, &sport.to_string()).await }
                })
                .await;
            Ok(1)
        }
    }
}

async fn run_once(settings: &Settings, sport_flag: &str) -> error::Result<usize> {
    let sports: Vec<Sport> = if sport_flag.eq_ignore_ascii_case("all") {
        Sport::ALL.to_vec()
    } else {
        vec![sport_flag
            .parse()
            .map_err(error::AggregatorError::Config)?]
    };

    let mut total = 0;
    for sport in sports {
        let mut client = db::connect(&settings.database_url).await?;
        let placeholder_client = Arc::new(db::connect(&settings.database_url).await?);
        let today = crawler::normalise::today_london();
        let dates: Vec<_> = (0..sport.default_lookahead_days())
            .map(|offset| today + chrono::Duration::days(offset))
            .collect();

        let slot_count =
            pipeline::run_sport_refresh(&mut client, placeholder_client, settings, sport, &dates).await?;
        total += slot_count;
    }
    Ok(total)
}
