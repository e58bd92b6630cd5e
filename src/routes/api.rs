// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON API over the activity cache.
//!
//! Every read goes through the sync engine, so asking for an unloaded period
//! fetches it first.

use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityDetail, MonthlySummary, WeeklySummary, YearlySummary};
use crate::services::SyncStatus;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(get_activities))
        .route("/api/activities/{id}", get(get_activity_detail))
        .route("/api/summary/week", get(get_week))
        .route("/api/summaries/weekly", get(get_weekly_summaries))
        .route("/api/summary/month", get(get_month))
        .route("/api/summary/year", get(get_year))
        .route("/api/sync/status", get(get_sync_status))
        .route("/api/sync/refresh", post(refresh))
        .route("/api/sync/load-more", post(load_more))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitiesResponse {
    pub activities: Vec<Activity>,
    pub count: usize,
    pub loaded_years: Vec<i32>,
}

async fn get_activities(State(state): State<Arc<AppState>>) -> Json<ActivitiesResponse> {
    let activities = state.engine.all_activities().await;

    Json(ActivitiesResponse {
        count: activities.len(),
        activities: activities.as_ref().clone(),
        loaded_years: state.engine.loaded_years(),
    })
}

async fn get_activity_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActivityDetail>> {
    tracing::debug!(activity_id = %id, "Fetching activity detail");

    if let Some(detail) = state.engine.activity_detail(&id).await {
        return Ok(Json(detail));
    }

    // Cached but unavailable means the remote fetch failed
    if state.engine.snapshot().iter().any(|a| a.id == id) {
        return Err(anyhow::anyhow!("Detail fetch failed for activity {}", id).into());
    }

    Err(AppError::NotFound(format!("Activity {} not found", id)))
}

// ─── Summaries ───────────────────────────────────────────────

#[derive(Deserialize)]
struct WeekQuery {
    /// Any day of the week; defaults to today
    start: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekResponse {
    #[serde(flatten)]
    pub summary: WeeklySummary,
    pub activities: Vec<Activity>,
}

async fn get_week(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeekQuery>,
) -> Json<WeekResponse> {
    let start = params.start.unwrap_or_else(|| state.engine.today());

    let summary = state.engine.weekly_summary(start).await;
    let activities = state.engine.activities_for_week(start).await;

    Json(WeekResponse {
        summary,
        activities,
    })
}

async fn get_weekly_summaries(State(state): State<Arc<AppState>>) -> Json<Vec<WeeklySummary>> {
    Json(state.engine.weekly_summaries().await)
}

#[derive(Deserialize, Validate)]
struct MonthQuery {
    #[validate(range(min = 1970, max = 9999))]
    year: i32,
    #[validate(range(min = 1, max = 12))]
    month: u32,
}

async fn get_month(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<MonthlySummary>> {
    params.validate()?;

    state
        .engine
        .monthly_summary(params.year, params.month)
        .await
        .map(Json)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid month {}", params.month)))
}

#[derive(Deserialize, Validate)]
struct YearQuery {
    /// Defaults to the current year
    #[validate(range(min = 1970, max = 9999))]
    year: Option<i32>,
}

async fn get_year(
    State(state): State<Arc<AppState>>,
    Query(params): Query<YearQuery>,
) -> Result<Json<YearlySummary>> {
    params.validate()?;

    let year = params.year.unwrap_or_else(|| state.engine.current_year());
    Ok(Json(state.engine.yearly_summary(year).await))
}

// ─── Sync ────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub status: SyncStatus,
    pub has_session: bool,
    pub loaded_years: Vec<i32>,
    pub activity_count: usize,
}

fn sync_status(state: &AppState) -> SyncStatusResponse {
    SyncStatusResponse {
        status: state.engine.status(),
        has_session: state.engine.session().has_session(),
        loaded_years: state.engine.loaded_years(),
        activity_count: state.engine.snapshot().len(),
    }
}

async fn get_sync_status(State(state): State<Arc<AppState>>) -> Json<SyncStatusResponse> {
    Json(sync_status(&state))
}

/// Drop the in-memory cache and reload the current year.
async fn refresh(State(state): State<Arc<AppState>>) -> Json<SyncStatusResponse> {
    state.engine.refresh().await;
    Json(sync_status(&state))
}

/// Page one calendar year further back.
async fn load_more(State(state): State<Arc<AppState>>) -> Json<SyncStatusResponse> {
    state.engine.load_more().await;
    Json(sync_status(&state))
}
