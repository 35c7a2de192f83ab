use chrono::Utc;
use tokio_postgres::Client;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Slot, Sport};

/// Truncates and bulk-inserts `slots` into `staging.<sport>`, then swaps
/// it into place as the new `public.<sport>` inside a single transaction:
/// drop archive, move master to archive, move staging to public, drop
/// archive. Readers only ever see either the old master table or the new
/// one, never an intermediate state — this is the zero-downtime dataset
/// replacement the aggregation pipeline depends on.
///
/// When `slots` is empty the swap is skipped entirely and the previous
/// master table is left untouched: a pipeline-wide zero-slot result is
/// treated as a refresh failure, not as "every court is fully booked".
pub async fn stage_and_swap(client: &mut Client, sport: Sport, slots: &[Slot]) -> Result<()> {
    let table = sport.table_name();

    if slots.is_empty() {
        warn!(sport = %sport, "refusing to swap in zero slots, keeping previous master table");
        return Ok(());
    }

    // Stamped once for the whole batch so every row from this refresh
    // shares one `last_refreshed`, satisfying "no row has `last_refreshed`
    // earlier than the run start" regardless of per-row insert latency.
    let run_started_at = Utc::now();

    let transaction = client.transaction().await?;

    transaction
        .execute(&format!("TRUNCATE TABLE staging.{table}"), &[])
        .await?;

    for slot in slots {
        transaction
            .execute(
                &format!(
                    "INSERT INTO staging.{table}
                        (uid, composite_key, category, date, starting_time, ending_time, price, spaces, booking_url, last_refreshed)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
                ),
                &[
                    &Uuid::new_v4(),
                    &slot.composite_key,
                    &slot.category,
                    &slot.date,
                    &slot.starting_time,
                    &slot.ending_time,
                    &slot.price,
                    &slot.spaces,
                    &slot.booking_url,
                    &slot.last_refreshed.unwrap_or(run_started_at),
                ],
            )
            .await?;
    }

    transaction
        .batch_execute(&format!(
            "DROP TABLE IF EXISTS archive.{table} CASCADE;
             ALTER TABLE public.{table} SET SCHEMA archive;
             ALTER TABLE staging.{table} SET SCHEMA public;
             DROP TABLE IF EXISTS archive.{table} CASCADE;"
        ))
        .await?;

    transaction.commit().await?;

    // staging.<table> no longer exists after the swap; recreate an empty
    // one so the next refresh has somewhere to stage into.
    recreate_staging_table(client, sport).await?;

    info!(sport = %sport, slot_count = slots.len(), "staged and swapped dataset");
    Ok(())
}

async fn recreate_staging_table(client: &Client, sport: Sport) -> Result<()> {
    let table = sport.table_name();
    client
        .batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS staging.{table} (
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
        ))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn sample_slot() -> Slot {
        Slot {
            composite_key: "abcd1234".to_string(),
            category: "badminton".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            starting_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            ending_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            price: "£8.00".to_string(),
            spaces: 2,
            booking_url: None,
            last_refreshed: None,
        }
    }

    #[test]
    fn sample_slot_is_available() {
        assert!(sample_slot().is_available());
    }
}
