// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Week / month / year rollups.
//!
//! Pure functions over an activity snapshot. Empty periods produce an
//! all-zero summary with a correctly sized histogram.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{Activity, MonthlySummary, PeriodTotals, WeeklySummary, YearlySummary};
use crate::time_utils::{days_in_month, week_start};

/// Activities in the Monday-based week containing `start`, newest first.
pub fn activities_in_week(activities: &[Activity], start: NaiveDate) -> Vec<Activity> {
    let monday = week_start(start);
    let sunday = monday + Duration::days(6);

    let mut week: Vec<Activity> = activities
        .iter()
        .filter(|a| (monday..=sunday).contains(&a.start_time.date()))
        .cloned()
        .collect();
    week.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    week
}

/// Summary of the week containing `start` (normalised to its Monday).
pub fn weekly_summary(activities: &[Activity], start: NaiveDate) -> WeeklySummary {
    let monday = week_start(start);
    let sunday = monday + Duration::days(6);

    let in_range: Vec<&Activity> = activities
        .iter()
        .filter(|a| (monday..=sunday).contains(&a.start_time.date()))
        .collect();

    let daily_distances = histogram(7, in_range.iter().map(|a| {
        (
            a.start_time.weekday().num_days_from_monday() as usize,
            a.distance_meters,
        )
    }));

    WeeklySummary {
        week_start: monday,
        week_end: sunday,
        totals: PeriodTotals::from_activities(in_range),
        daily_distances,
    }
}

/// Summary of a calendar month; `None` for an invalid month.
pub fn monthly_summary(activities: &[Activity], year: i32, month: u32) -> Option<MonthlySummary> {
    let days = days_in_month(year, month)?;

    let in_range: Vec<&Activity> = activities
        .iter()
        .filter(|a| a.start_time.year() == year && a.start_time.month() == month)
        .collect();

    let daily_distances = histogram(
        days as usize,
        in_range
            .iter()
            .map(|a| (a.start_time.day0() as usize, a.distance_meters)),
    );

    Some(MonthlySummary {
        year,
        month,
        totals: PeriodTotals::from_activities(in_range),
        daily_distances,
    })
}

/// Summary of a calendar year.
pub fn yearly_summary(activities: &[Activity], year: i32) -> YearlySummary {
    let in_range: Vec<&Activity> = activities
        .iter()
        .filter(|a| a.start_time.year() == year)
        .collect();

    let monthly_distances = histogram(
        12,
        in_range
            .iter()
            .map(|a| (a.start_time.month0() as usize, a.distance_meters)),
    );

    YearlySummary {
        year,
        totals: PeriodTotals::from_activities(in_range),
        monthly_distances,
    }
}

/// One summary per week that has activity, newest week first.
pub fn weekly_summaries(activities: &[Activity]) -> Vec<WeeklySummary> {
    let weeks: BTreeSet<NaiveDate> = activities
        .iter()
        .map(|a| week_start(a.start_time.date()))
        .collect();

    weeks
        .into_iter()
        .rev()
        .map(|monday| weekly_summary(activities, monday))
        .collect()
}

/// Fixed-size distance histogram; out-of-range buckets are ignored.
fn histogram(size: usize, entries: impl Iterator<Item = (usize, u32)>) -> Vec<u32> {
    let mut buckets = vec![0u32; size];
    for (index, distance) in entries {
        if let Some(bucket) = buckets.get_mut(index) {
            *bucket = bucket.saturating_add(distance);
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SwimType;

    fn swim(id: &str, y: i32, m: u32, d: u32, distance: u32, pace: u32) -> Activity {
        Activity {
            id: id.to_string(),
            swim_type: SwimType::Pool,
            activity_name: None,
            start_time: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap(),
            distance_meters: distance,
            duration_seconds: u64::from(distance),
            calories: distance / 10,
            avg_pace_seconds_per_100m: pace,
            avg_heart_rate: None,
            swolf: None,
            total_strokes: None,
        }
    }

    fn sample() -> Vec<Activity> {
        vec![
            // Week of Mon 2024-01-15
            swim("a", 2024, 1, 15, 1000, 0),
            swim("b", 2024, 1, 17, 1500, 120),
            swim("c", 2024, 1, 21, 2000, 140),
            // Following week
            swim("d", 2024, 1, 22, 800, 110),
            // Next month
            swim("e", 2024, 2, 29, 1200, 100),
        ]
    }

    #[test]
    fn test_weekly_summary() {
        let summary = weekly_summary(&sample(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        assert_eq!(summary.week_end, NaiveDate::from_ymd_opt(2024, 1, 21).unwrap());
        assert_eq!(summary.totals.swim_count, 3);
        assert_eq!(summary.totals.total_distance_meters, 4500);
        assert_eq!(summary.totals.avg_pace_seconds_per_100m, 130);
        assert_eq!(summary.daily_distances, vec![1000, 0, 1500, 0, 0, 0, 2000]);
    }

    #[test]
    fn test_week_start_is_normalised() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let summary = weekly_summary(&sample(), wednesday);
        assert_eq!(summary.week_start, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(summary.totals.swim_count, 3);
    }

    #[test]
    fn test_empty_periods_are_zero() {
        let empty: Vec<Activity> = Vec::new();

        let week = weekly_summary(&empty, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(week.totals, PeriodTotals::default());
        assert_eq!(week.daily_distances, vec![0; 7]);

        let feb = monthly_summary(&empty, 2024, 2).unwrap();
        assert_eq!(feb.totals, PeriodTotals::default());
        assert_eq!(feb.daily_distances.len(), 29);

        let feb = monthly_summary(&empty, 2023, 2).unwrap();
        assert_eq!(feb.daily_distances.len(), 28);

        let year = yearly_summary(&empty, 2024);
        assert_eq!(year.monthly_distances, vec![0; 12]);
    }

    #[test]
    fn test_monthly_summary() {
        let jan = monthly_summary(&sample(), 2024, 1).unwrap();
        assert_eq!(jan.totals.swim_count, 4);
        assert_eq!(jan.daily_distances.len(), 31);
        assert_eq!(jan.daily_distances[14], 1000);
        assert_eq!(jan.daily_distances[21], 800);

        let feb = monthly_summary(&sample(), 2024, 2).unwrap();
        assert_eq!(feb.daily_distances[28], 1200);

        assert!(monthly_summary(&sample(), 2024, 13).is_none());
    }

    #[test]
    fn test_yearly_summary() {
        let year = yearly_summary(&sample(), 2024);
        assert_eq!(year.totals.swim_count, 5);
        assert_eq!(year.totals.total_distance_meters, 6500);
        assert_eq!(year.monthly_distances[0], 5300);
        assert_eq!(year.monthly_distances[1], 1200);
        assert_eq!(year.totals.avg_pace_seconds_per_100m, 117);

        assert_eq!(yearly_summary(&sample(), 2023).totals.swim_count, 0);
    }

    #[test]
    fn test_weekly_summaries_newest_first() {
        let weeks = weekly_summaries(&sample());
        let starts: Vec<NaiveDate> = weeks.iter().map(|w| w.week_start).collect();
        assert_eq!(
            starts,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 26).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 22).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            ]
        );
    }

    #[test]
    fn test_activities_in_week_sorted_desc() {
        let week = activities_in_week(&sample(), NaiveDate::from_ymd_opt(2024, 1, 18).unwrap());
        let ids: Vec<&str> = week.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_histogram_skips_out_of_range() {
        let buckets = histogram(3, vec![(0, 5), (2, 1), (3, 100)].into_iter());
        assert_eq!(buckets, vec![5, 0, 1]);
    }
}
