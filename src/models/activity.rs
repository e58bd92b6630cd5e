// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Swim activity model for the local cache and API.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Pool or open-water swim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwimType {
    Pool,
    OpenWater,
}

/// Cached swim activity.
///
/// Activities are never mutated once cached; a refresh replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Remote activity ID (unique within the cache)
    pub id: String,
    #[serde(rename = "type")]
    pub swim_type: SwimType,
    /// Activity name/title
    #[serde(default)]
    pub activity_name: Option<String>,
    /// Local start time, second precision
    #[serde(with = "crate::time_utils::local_datetime")]
    pub start_time: NaiveDateTime,
    pub distance_meters: u32,
    pub duration_seconds: u64,
    pub calories: u32,
    /// Seconds per 100m; 0 means unknown
    pub avg_pace_seconds_per_100m: u32,
    #[serde(default)]
    pub avg_heart_rate: Option<u32>,
    #[serde(default)]
    pub swolf: Option<u32>,
    #[serde(default)]
    pub total_strokes: Option<u32>,
}

/// Pace in whole seconds per 100m from a speed in m/s.
///
/// Returns 0 when the speed is absent or non-positive.
pub fn pace_from_speed(speed_mps: Option<f64>) -> u32 {
    match speed_mps {
        Some(speed) if speed > 0.0 && speed.is_finite() => (100.0 / speed).floor() as u32,
        _ => 0,
    }
}
