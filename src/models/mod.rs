// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod detail;
pub mod summary;

pub use activity::{pace_from_speed, Activity, SwimType};
pub use detail::{ActivityDetail, Lap, MetricPoint, MetricSeries};
pub use summary::{MonthlySummary, PeriodTotals, WeeklySummary, YearlySummary};
