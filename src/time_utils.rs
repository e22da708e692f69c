// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp the way WHOOP range queries expect:
/// millisecond precision with a `Z` suffix.
pub fn format_query_timestamp(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The UTC calendar day a timestamp falls on.
pub fn utc_day(date: DateTime<Utc>) -> NaiveDate {
    date.date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_query_timestamp_has_millis() {
        let date = Utc.with_ymd_and_hms(2026, 3, 9, 6, 5, 4).unwrap();
        assert_eq!(format_query_timestamp(date), "2026-03-09T06:05:04.000Z");
    }

    #[test]
    fn test_utc_day_truncates() {
        let date = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(utc_day(date), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
    }
}
