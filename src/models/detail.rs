// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-activity detail: laps and chart series.
//!
//! Built on demand for each detail request and never persisted.

use serde::Serialize;

use crate::models::Activity;

/// One lap of a swim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    /// Declared lap index, or 1-based position when the remote omits it
    pub index: u32,
    pub duration_seconds: f64,
    pub distance_meters: f64,
    pub pace_seconds_per_100m: u32,
    pub avg_heart_rate: Option<u32>,
    pub stroke_count: Option<u32>,
    pub swolf: Option<u32>,
}

/// A single chart point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricPoint {
    /// Cumulative elapsed seconds
    pub x: f64,
    pub y: f64,
}

/// Parallel chart series. Points with non-positive values are never present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSeries {
    pub pace: Vec<MetricPoint>,
    pub heart_rate: Vec<MetricPoint>,
    pub swolf: Vec<MetricPoint>,
}

/// Activity summary plus laps and series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityDetail {
    pub summary: Activity,
    pub laps: Vec<Lap>,
    pub metrics: MetricSeries,
}
