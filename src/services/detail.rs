// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reshape raw splits into laps and chart series.
//!
//! Lengths (one pool length each) give the best resolution, so the series
//! are built from them whenever any exist, falling back to whole laps.

use crate::models::{pace_from_speed, Activity, ActivityDetail, Lap, MetricPoint, MetricSeries};
use crate::services::garmin::{LapDto, LengthDto, SplitsResponse};

/// One record feeding the chart series.
#[derive(Debug, Clone, Copy, Default)]
struct Sample {
    duration: Option<f64>,
    speed: Option<f64>,
    heart_rate: Option<f64>,
    swolf: Option<f64>,
}

impl From<&LengthDto> for Sample {
    fn from(length: &LengthDto) -> Self {
        Self {
            duration: length.duration,
            speed: length.average_speed,
            heart_rate: length.average_hr,
            swolf: length.average_swolf,
        }
    }
}

impl From<&LapDto> for Sample {
    fn from(lap: &LapDto) -> Self {
        Self {
            duration: lap.duration,
            speed: lap.average_speed,
            heart_rate: lap.average_hr,
            swolf: lap.average_swolf,
        }
    }
}

/// Build the detail view for `summary` from its splits.
pub fn build_detail(summary: Activity, splits: &SplitsResponse) -> ActivityDetail {
    let lap_dtos = splits.laps.as_deref().unwrap_or_default();

    let laps = lap_dtos
        .iter()
        .enumerate()
        .map(|(position, dto)| build_lap(position, dto))
        .collect();

    let nested: Vec<Sample> = lap_dtos
        .iter()
        .flat_map(|lap| lap.lengths.as_deref().unwrap_or_default())
        .map(Sample::from)
        .collect();

    let samples = if !nested.is_empty() {
        nested
    } else if let Some(lengths) = splits.lengths.as_deref().filter(|l| !l.is_empty()) {
        lengths.iter().map(Sample::from).collect()
    } else {
        lap_dtos.iter().map(Sample::from).collect()
    };

    ActivityDetail {
        summary,
        laps,
        metrics: build_series(&samples),
    }
}

fn build_lap(position: usize, dto: &LapDto) -> Lap {
    let fallback_index = u32::try_from(position + 1).unwrap_or(u32::MAX);
    Lap {
        index: dto.lap_index.unwrap_or(fallback_index),
        duration_seconds: dto.duration.unwrap_or(0.0),
        distance_meters: dto.distance.unwrap_or(0.0),
        pace_seconds_per_100m: pace_from_speed(dto.average_speed),
        avg_heart_rate: dto.average_hr.map(|v| v as u32),
        stroke_count: dto.total_strokes.map(|v| v as u32),
        swolf: dto.average_swolf.map(|v| v as u32),
    }
}

/// Cumulative-duration series; non-positive values produce no point.
fn build_series(samples: &[Sample]) -> MetricSeries {
    let mut series = MetricSeries::default();
    let mut elapsed = 0.0;

    for sample in samples {
        elapsed += sample.duration.unwrap_or(0.0);

        if let Some(speed) = positive(sample.speed) {
            series.pace.push(MetricPoint {
                x: elapsed,
                y: 100.0 / speed,
            });
        }
        if let Some(hr) = positive(sample.heart_rate) {
            series.heart_rate.push(MetricPoint { x: elapsed, y: hr });
        }
        if let Some(swolf) = positive(sample.swolf) {
            series.swolf.push(MetricPoint { x: elapsed, y: swolf });
        }
    }

    series
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}
