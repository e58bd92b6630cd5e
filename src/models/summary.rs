//! Week / month / year rollups over the cached activities.
//!
//! These are recomputed from the current snapshot on every read and are
//! never persisted.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Activity;

/// Totals and averages shared by every summary period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotals {
    // ─── Sums ────────────────────────────────────────────────────
    pub total_distance_meters: u64,
    pub total_duration_seconds: u64,
    pub total_calories: u64,
    pub swim_count: u32,

    // ─── Averages ────────────────────────────────────────────────
    /// Mean over activities with a known (positive) pace only
    pub avg_pace_seconds_per_100m: u32,
    /// Mean over activities with a positive heart rate only
    pub avg_heart_rate: u32,
    /// Mean over activities with a positive SWOLF only
    pub avg_swolf: u32,
}

impl PeriodTotals {
    /// Sum and average a set of activities.
    ///
    /// Absent and non-positive values are both left out of the averages,
    /// so a swim without a heart-rate strap does not drag the mean to zero.
    pub fn from_activities<'a, I>(activities: I) -> Self
    where
        I: IntoIterator<Item = &'a Activity>,
    {
        let mut totals = Self::default();
        let mut pace = PositiveMean::default();
        let mut heart_rate = PositiveMean::default();
        let mut swolf = PositiveMean::default();

        for activity in activities {
            totals.total_distance_meters += u64::from(activity.distance_meters);
            totals.total_duration_seconds += activity.duration_seconds;
            totals.total_calories += u64::from(activity.calories);
            totals.swim_count += 1;

            pace.add(Some(activity.avg_pace_seconds_per_100m));
            heart_rate.add(activity.avg_heart_rate);
            swolf.add(activity.swolf);
        }

        totals.avg_pace_seconds_per_100m = pace.mean();
        totals.avg_heart_rate = heart_rate.mean();
        totals.avg_swolf = swolf.mean();
        totals
    }
}

/// Integer mean over strictly positive samples.
#[derive(Default)]
struct PositiveMean {
    sum: u64,
    count: u64,
}

impl PositiveMean {
    fn add(&mut self, value: Option<u32>) {
        if let Some(v) = value.filter(|v| *v > 0) {
            self.sum += u64::from(v);
            self.count += 1;
        }
    }

    fn mean(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        u32::try_from(self.sum / self.count).unwrap_or(u32::MAX)
    }
}

/// Summary for the seven days starting on a Monday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    #[serde(flatten)]
    pub totals: PeriodTotals,
    /// Distance per day, Monday first (always 7 entries)
    pub daily_distances: Vec<u32>,
}

/// Summary for a calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub totals: PeriodTotals,
    /// Distance per day of month (one entry per day)
    pub daily_distances: Vec<u32>,
}

/// Summary for a calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlySummary {
    pub year: i32,
    #[serde(flatten)]
    pub totals: PeriodTotals,
    /// Distance per month, January first (always 12 entries)
    pub monthly_distances: Vec<u32>,
}
