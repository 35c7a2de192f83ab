use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Europe::London;

/// Shared normalisation helpers used across response parsers, so the
/// time-zone and roll-up logic only needs grounding and testing once.
pub fn today_london() -> NaiveDate {
    Utc::now().with_timezone(&London).date_naive()
}

/// Converts a UTC epoch-second timestamp into Europe/London local date and
/// time, handling the BST/GMT transition the way the original Tower
/// Hamlets adapter did by converting through `astimezone`.
pub fn to_london_local(utc_epoch_seconds: i64) -> Option<(NaiveDate, NaiveTime)> {
    let utc = DateTime::<Utc>::from_timestamp(utc_epoch_seconds, 0)?;
    let local = utc.with_timezone(&London);
    Some((local.date_naive(), local.time()))
}

/// Rounds a time up to the next whole minute when it carries seconds,
/// mirroring the original `round_to_nearest_minute` behaviour exactly.
pub fn round_up_to_minute(time: NaiveTime) -> NaiveTime {
    if time.second() == 0 {
        return time;
    }
    let total_minutes = i64::from(time.hour()) * 60 + i64::from(time.minute()) + 1;
    let hour = (total_minutes / 60).rem_euclid(24) as u32;
    let minute = (total_minutes % 60) as u32;
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(time)
}

/// Groups `(starting_time, ending_time, available_courts)` rows by their
/// `(start, end)` pair and sums the available-court counts into a single
/// `spaces` value per interval — the per-court roll-up every detailed
/// provider (Type D and Type E adapters) needs.
pub fn rollup_by_interval(
    rows: impl IntoIterator<Item = (NaiveTime, NaiveTime, i32)>,
) -> Vec<(NaiveTime, NaiveTime, i32)> {
    let mut totals: HashMap<(NaiveTime, NaiveTime), i32> = HashMap::new();
    let mut order: Vec<(NaiveTime, NaiveTime)> = Vec::new();
    for (start, end, count) in rows {
        let key = (start, end);
        if !totals.contains_key(&key) {
            order.push(key);
        }
        *totals.entry(key).or_insert(0) += count;
    }
    order
        .into_iter()
        .map(|key| (key.0, key.1, totals[&key]))
        .collect()
}

/// Normalises a provider's price string to correct UTF-8, repairing the
/// mojibake `Â£` byte sequence some upstream HTML/JSON responses carry in
/// place of a plain `£`.
pub fn clean_price(raw: &str) -> String {
    raw.replace('\u{c2}', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollup_by_interval_sums_counts_for_same_window() {
        let start = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        let rows = vec![(start, end, 1), (start, end, 1), (start, end, 1)];
        let rolled = rollup_by_interval(rows);
        assert_eq!(rolled, vec![(start, end, 3)]);
    }

    #[test]
    fn rollup_by_interval_keeps_distinct_windows_separate() {
        let a_start = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        let a_end = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        let b_start = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        let b_end = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        let rolled = rollup_by_interval(vec![(a_start, a_end, 2), (b_start, b_end, 1)]);
        assert_eq!(rolled, vec![(a_start, a_end, 2), (b_start, b_end, 1)]);
    }

    #[test]
    fn round_up_to_minute_bumps_when_seconds_present() {
        let with_seconds = NaiveTime::from_hms_opt(18, 59, 30).unwrap();
        assert_eq!(
            round_up_to_minute(with_seconds),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap()
        );
    }

    #[test]
    fn round_up_to_minute_is_identity_on_exact_minute() {
        let exact = NaiveTime::from_hms_opt(18, 30, 0).unwrap();
        assert_eq!(round_up_to_minute(exact), exact);
    }

    #[test]
    fn clean_price_repairs_mojibake_pound_sign() {
        assert_eq!(clean_price("\u{c2}£8.50"), "£8.50");
        assert_eq!(clean_price(" £8.50 "), "£8.50");
    }

    #[test]
    fn to_london_local_handles_summer_and_winter_offsets() {
        // 2024-07-01 12:00 UTC -> 13:00 BST
        let (date, time) = to_london_local(1_719_835_200).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(time, NaiveTime::from_hms_opt(13, 0, 0).unwrap());

        // 2024-01-01 12:00 UTC -> 12:00 GMT
        let (date, time) = to_london_local(1_704_110_400).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(time, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }
}
