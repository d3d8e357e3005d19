// Blitz calendar: Timestamp <-> the configured zone's wall clock.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use spacetimedb::Timestamp;

use crate::config::GameConfig;

/// Used when the stored zone name does not parse
pub const DEFAULT_ZONE: Tz = chrono_tz::Europe::Stockholm;

pub fn to_utc(ts: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.to_micros_since_unix_epoch()).unwrap_or_default()
}

pub fn from_utc(dt: DateTime<Utc>) -> Timestamp {
    Timestamp::from_micros_since_unix_epoch(dt.timestamp_micros())
}

pub fn parse_zone(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}

pub fn zone(config: &GameConfig) -> Tz {
    parse_zone(&config.time_zone).unwrap_or_else(|| {
        log::warn!("[CONFIG] unknown time_zone '{}', using {}", config.time_zone, DEFAULT_ZONE);
        DEFAULT_ZONE
    })
}

pub fn local_datetime(ts: Timestamp, config: &GameConfig) -> NaiveDateTime {
    to_utc(ts).with_timezone(&zone(config)).naive_local()
}

pub fn local_date(ts: Timestamp, config: &GameConfig) -> NaiveDate {
    local_datetime(ts, config).date()
}

/// `YYYY-MM-DD` of the local day
pub fn day_key(ts: Timestamp, config: &GameConfig) -> String {
    local_date(ts, config).format("%Y-%m-%d").to_string()
}

/// `YYYY-MM` of the local month, the leaderboard period
pub fn month_key(ts: Timestamp, config: &GameConfig) -> String {
    local_date(ts, config).format("%Y-%m").to_string()
}

/// Instant at which the local wall clock on `date` shows `minute` past midnight.
/// A time skipped by a clock change resolves to the instant one hour later;
/// a repeated time resolves to its first occurrence.
pub fn local_minute(date: NaiveDate, minute: u32, config: &GameConfig) -> Timestamp {
    let tz = zone(config);
    let local = date.and_hms_opt(0, 0, 0).unwrap_or_default() + Duration::minutes(minute as i64);
    let resolved = tz
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest());
    match resolved {
        Some(dt) => from_utc(dt.with_timezone(&Utc)),
        None => from_utc(local.and_utc()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
        let utc = NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap().and_utc();
        from_utc(utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_summer_time_boundaries() {
        let config = GameConfig::default();
        let hour = |ts| local_datetime(ts, &config).format("%H:%M").to_string();
        // Spring forward 2024-03-31 01:00 UTC
        assert_eq!(hour(at(2024, 3, 31, 0, 59)), "01:59");
        assert_eq!(hour(at(2024, 3, 31, 1, 0)), "03:00");
        // Fall back 2024-10-27 01:00 UTC
        assert_eq!(hour(at(2024, 10, 27, 0, 59)), "02:59");
        assert_eq!(hour(at(2024, 10, 27, 1, 0)), "02:00");
    }

    #[test]
    fn test_day_key_rolls_over_at_local_midnight() {
        let config = GameConfig::default();
        // Summer: UTC+2
        assert_eq!(day_key(at(2024, 7, 1, 21, 30), &config), "2024-07-01");
        assert_eq!(day_key(at(2024, 7, 1, 22, 30), &config), "2024-07-02");
        // Winter: UTC+1
        assert_eq!(day_key(at(2024, 1, 15, 22, 30), &config), "2024-01-15");
        assert_eq!(day_key(at(2024, 1, 15, 23, 30), &config), "2024-01-16");
        assert_eq!(month_key(at(2024, 1, 31, 23, 30), &config), "2024-02");
    }

    #[test]
    fn test_local_minute() {
        let config = GameConfig::default();
        assert_eq!(local_minute(date(2024, 7, 2), 1185, &config), at(2024, 7, 2, 17, 45));
        assert_eq!(local_minute(date(2024, 1, 16), 1200, &config), at(2024, 1, 16, 19, 0));

        let utc_only = GameConfig { time_zone: "UTC".to_string(), ..GameConfig::default() };
        assert_eq!(local_minute(date(2024, 7, 2), 1200, &utc_only), at(2024, 7, 2, 20, 0));

        let new_york = GameConfig { time_zone: "America/New_York".to_string(), ..GameConfig::default() };
        assert_eq!(local_minute(date(2024, 7, 2), 1200, &new_york), at(2024, 7, 3, 0, 0));
    }

    #[test]
    fn test_local_minute_across_clock_changes() {
        let config = GameConfig::default();
        // 02:30 does not exist on 2024-03-31; 03:30 CEST is 01:30 UTC
        assert_eq!(local_minute(date(2024, 3, 31), 150, &config), at(2024, 3, 31, 1, 30));
        // 02:30 happens twice on 2024-10-27; the first is still CEST
        assert_eq!(local_minute(date(2024, 10, 27), 150, &config), at(2024, 10, 27, 0, 30));
    }

    #[test]
    fn test_unknown_zone_falls_back() {
        assert!(parse_zone("Europe/Stockholm").is_some());
        assert!(parse_zone("Mars/Olympus").is_none());
        let config = GameConfig { time_zone: "Mars/Olympus".to_string(), ..GameConfig::default() };
        assert_eq!(zone(&config), DEFAULT_ZONE);
    }
}
