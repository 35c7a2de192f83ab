pub mod staging;

use tokio_postgres::Client;
use tracing::info;

use crate::error::Result;

/// Creates the three logical schemas and the per-sport master/staging
/// tables if they don't already exist. Idempotent, safe to run on every
/// startup and from the `init-db` CLI subcommand.
pub async fn ensure_schema(client: &Client) -> Result<()> {
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS public;
             CREATE SCHEMA IF NOT EXISTS staging;
             CREATE SCHEMA IF NOT EXISTS archive;

             CREATE TABLE IF NOT EXISTS public.sportsvenue (
                 composite_key TEXT PRIMARY KEY,
                 organisation TEXT NOT NULL,
                 organisation_website TEXT NOT NULL,
                 venue_name TEXT NOT NULL,
                 slug TEXT NOT NULL,
                 sports TEXT[] NOT NULL,
                 postcode TEXT,
                 address TEXT,
                 latitude DOUBLE PRECISION NOT NULL,
                 longitude DOUBLE PRECISION NOT NULL
             );",
        )
        .await?;

    for sport in crate::models::Sport::ALL {
        let table = sport.table_name();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS public.{table} (
                 uid UUID PRIMARY KEY,
                 composite_key TEXT NOT NULL REFERENCES public.sportsvenue(composite_key),
                 category TEXT NOT NULL,
                 date DATE NOT NULL,
                 starting_time TIME NOT NULL,
                 ending_time TIME NOT NULL,
                 price TEXT NOT NULL,
                 spaces INTEGER NOT NULL,
                 booking_url TEXT,
                 last_refreshed TIMESTAMPTZ NOT NULL DEFAULT now()
             );
             CREATE TABLE IF NOT EXISTS staging.{table} (
                 uid UUID PRIMARY KEY,
                 composite_key TEXT NOT NULL REFERENCES public.sportsvenue(composite_key),
                 category TEXT NOT NULL,
                 date DATE NOT NULL,
                 starting_time TIME NOT NULL,
                 ending_time TIME NOT NULL,
                 price TEXT NOT NULL,
                 spaces INTEGER NOT NULL,
                 booking_url TEXT,
                 last_refreshed TIMESTAMPTZ NOT NULL DEFAULT now()
             );"
        );
        client.batch_execute(&ddl).await?;
    }

    info!("schema ensured");
    Ok(())
}
