// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// Format used by the remote `startTimeLocal` field and the on-disk cache.
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a `yyyy-MM-dd HH:mm:ss` local timestamp.
pub fn parse_local_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), LOCAL_DATETIME_FORMAT).ok()
}

/// Format a local timestamp as `yyyy-MM-dd HH:mm:ss`.
pub fn format_local_datetime(value: &NaiveDateTime) -> String {
    value.format(LOCAL_DATETIME_FORMAT).to_string()
}

/// First and last day of a calendar year as `YYYY-MM-DD` search bounds.
pub fn year_window(year: i32) -> (String, String) {
    (format!("{year:04}-01-01"), format!("{year:04}-12-31"))
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Number of days in a calendar month, `None` for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from((next - first).num_days()).ok()
}

/// Serde codec for `NaiveDateTime` fields stored as `yyyy-MM-dd HH:mm:ss`.
pub mod local_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_local_datetime(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_local_datetime(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid local datetime: {raw:?}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_local_datetime() {
        let parsed = parse_local_datetime("2025-12-30 10:31:49").unwrap();
        assert_eq!(parsed.year(), 2025);
        assert_eq!(format_local_datetime(&parsed), "2025-12-30 10:31:49");
    }

    #[test]
    fn test_parse_rejects_iso_t_separator() {
        assert!(parse_local_datetime("2025-12-30T10:31:49").is_none());
        assert!(parse_local_datetime("").is_none());
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2024-01-17 is a Wednesday
        let wed = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        assert_eq!(week_start(wed), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        let mon = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(week_start(mon), mon);

        let sun = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();
        assert_eq!(week_start(sun), mon);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 4), Some(30));
        assert_eq!(days_in_month(2024, 13), None);
        assert_eq!(days_in_month(2024, 0), None);
    }

    #[test]
    fn test_year_window() {
        assert_eq!(
            year_window(2024),
            ("2024-01-01".to_string(), "2024-12-31".to_string())
        );
    }
}
