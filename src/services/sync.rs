// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity cache and year-by-year sync.
//!
//! The engine exclusively owns the activity collection. Readers get an
//! immutable `Arc<Vec<Activity>>` snapshot that is swapped atomically after
//! each merge, so a reader never sees a half-merged collection.
//!
//! Locking:
//! - `cache_lock` guards the one-time disk load (double-checked)
//! - `write_lock` serializes fetch-merge-persist so two concurrent year
//!   fetches cannot drop each other's results
//!
//! Remote failures are logged and absorbed; callers observe "no new data".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use dashmap::DashSet;
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::config::Config;
use crate::db::ActivityStore;
use crate::error::RemoteError;
use crate::models::{Activity, ActivityDetail, MonthlySummary, WeeklySummary, YearlySummary};
use crate::services::aggregation;
use crate::services::auth::{Authenticator, CredentialsProvider};
use crate::services::cookies::CookieStore;
use crate::services::detail::build_detail;
use crate::services::garmin::{ActivitySearch, GarminClient};
use crate::services::session::SessionState;
use crate::time_utils::{week_start, year_window};

/// Activity type requested from the search endpoint.
const SEARCH_ACTIVITY_TYPE: &str = "swimming";

/// Upper bound on search pages per year.
const MAX_SEARCH_PAGES: u32 = 50;

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Source of "today" for the default sync year.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    fn current_year(&self) -> i32 {
        self.today().year()
    }
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Fixed date, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Observable sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Loading { year: i32 },
    /// Last login attempt failed; only cached data is available
    Unauthenticated,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Owner of the activity cache.
pub struct SyncEngine {
    client: GarminClient,
    auth: Arc<Authenticator>,
    store: ActivityStore,
    clock: Arc<dyn Clock>,
    min_history_year: i32,
    page_size: u32,

    snapshot: watch::Sender<Arc<Vec<Activity>>>,
    loaded_years: DashSet<i32>,
    cache_loaded: AtomicBool,
    cache_lock: Mutex<()>,
    write_lock: Mutex<()>,
    status: watch::Sender<SyncStatus>,
}

impl SyncEngine {
    pub fn new(
        config: &Config,
        client: GarminClient,
        auth: Arc<Authenticator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (status, _) = watch::channel(SyncStatus::Idle);

        Self {
            client,
            auth,
            store: ActivityStore::new(config.cache_file()),
            clock,
            min_history_year: config.min_history_year,
            page_size: config.search_page_size.max(1),
            snapshot,
            loaded_years: DashSet::new(),
            cache_loaded: AtomicBool::new(false),
            cache_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
            status,
        }
    }

    /// Wire up a cookie store, client, session and authenticator for `config`.
    pub fn from_config(
        config: &Config,
        credentials: Arc<dyn CredentialsProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RemoteError> {
        let cookies = Arc::new(CookieStore::new());
        let client = GarminClient::new(config, cookies)?;
        let session = Arc::new(SessionState::new());
        let auth = Arc::new(Authenticator::new(client.clone(), session, credentials));
        Ok(Self::new(config, client, auth, clock))
    }

    pub fn session(&self) -> &SessionState {
        self.auth.session()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn current_year(&self) -> i32 {
        self.clock.current_year()
    }

    // ─── Observation ─────────────────────────────────────────────────────────

    /// Current snapshot without triggering any load.
    pub fn snapshot(&self) -> Arc<Vec<Activity>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe_activities(&self) -> watch::Receiver<Arc<Vec<Activity>>> {
        self.snapshot.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Years fetched (or restored from disk), ascending.
    pub fn loaded_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.loaded_years.iter().map(|y| *y).collect();
        years.sort_unstable();
        years
    }

    // ─── Loading ─────────────────────────────────────────────────────────────

    /// Read the disk cache once per process.
    pub async fn ensure_cache_loaded(&self) {
        if self.cache_loaded.load(Ordering::Acquire) {
            return;
        }

        let _guard = self.cache_lock.lock().await;

        // Double-check: another task may have loaded while we waited
        if self.cache_loaded.load(Ordering::Acquire) {
            return;
        }

        match self.store.load().await {
            Ok(Some(activities)) => {
                for activity in activities.iter() {
                    self.loaded_years.insert(activity.start_time.year());
                }
                let restored = merge_activities(&[], activities);
                tracing::debug!(
                    count = restored.len(),
                    years = ?self.loaded_years(),
                    "Cache hit: restored activities from disk"
                );
                self.snapshot.send_replace(Arc::new(restored));
            }
            Ok(None) => {
                tracing::debug!(path = %self.store.path().display(), "Cache miss: no cache file");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read activity cache");
            }
        }

        self.cache_loaded.store(true, Ordering::Release);
    }

    /// Make sure `year` has been fetched at least once.
    ///
    /// With `force_refresh` the year is fetched even if already loaded.
    pub async fn ensure_data_loaded(&self, year: i32, force_refresh: bool) {
        self.ensure_cache_loaded().await;

        if !self.ensure_session().await {
            return;
        }

        if !force_refresh && self.loaded_years.contains(&year) {
            tracing::debug!(year, "Cache hit: year already loaded");
            return;
        }

        let _writer = self.write_lock.lock().await;

        // Double-check: a concurrent caller may have fetched this year
        if !force_refresh && self.loaded_years.contains(&year) {
            tracing::debug!(year, "Cache hit: year loaded while waiting");
            return;
        }

        self.status.send_replace(SyncStatus::Loading { year });
        let token = self.session().token();

        match self.fetch_year(&token, year).await {
            Ok(batch) => self.merge_and_persist(year, batch).await,
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(year, "Session rejected during sync; logging in again");
                self.auth.relogin(&token).await;
            }
            Err(e) => {
                tracing::error!(year, error = %e, "Failed to fetch activities");
            }
        }

        self.status.send_if_modified(|status| {
            if matches!(status, SyncStatus::Loading { .. }) {
                *status = SyncStatus::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Fetch the year before the oldest loaded one, down to the history floor.
    pub async fn load_more(&self) {
        self.ensure_cache_loaded().await;

        let oldest = self
            .loaded_years
            .iter()
            .map(|y| *y)
            .min()
            .unwrap_or_else(|| self.current_year());
        let next = oldest - 1;

        if next < self.min_history_year {
            tracing::debug!(
                year = next,
                min = self.min_history_year,
                "Reached history floor"
            );
            return;
        }

        self.ensure_data_loaded(next, false).await;
    }

    /// Drop everything in memory and reload the current year.
    pub async fn refresh(&self) {
        self.ensure_cache_loaded().await;

        {
            let _writer = self.write_lock.lock().await;
            self.loaded_years.clear();
            self.snapshot.send_replace(Arc::new(Vec::new()));
        }

        tracing::info!("Manual refresh requested");
        self.ensure_data_loaded(self.current_year(), true).await;
    }

    async fn ensure_session(&self) -> bool {
        if self.auth.ensure_session().await {
            self.status.send_if_modified(|status| {
                if *status == SyncStatus::Unauthenticated {
                    *status = SyncStatus::Idle;
                    true
                } else {
                    false
                }
            });
            return true;
        }

        tracing::warn!("Not authenticated; serving cached data only");
        self.status.send_replace(SyncStatus::Unauthenticated);
        false
    }

    /// Every swim in the year's search window, all pages.
    async fn fetch_year(&self, token: &str, year: i32) -> Result<Vec<Activity>, RemoteError> {
        let (start_date, end_date) = year_window(year);
        tracing::info!(year, "Fetching activities");

        let mut batch = Vec::new();
        for page in 0..MAX_SEARCH_PAGES {
            let search = ActivitySearch {
                activity_type: SEARCH_ACTIVITY_TYPE.to_string(),
                start_date: start_date.clone(),
                end_date: end_date.clone(),
                limit: self.page_size,
                start: page * self.page_size,
            };

            let records = self.client.search_activities(token, &search).await?;
            let received = records.len();

            for dto in records.iter().filter(|dto| dto.is_swim()) {
                match dto.to_activity() {
                    Some(activity) => batch.push(activity),
                    None => tracing::warn!(
                        activity_id = dto.activity_id,
                        "Skipping activity with unparseable start time"
                    ),
                }
            }

            if received < self.page_size as usize {
                break;
            }
        }

        tracing::info!(year, count = batch.len(), "Fetched swim activities");
        Ok(batch)
    }

    async fn merge_and_persist(&self, year: i32, batch: Vec<Activity>) {
        let current = self.snapshot();
        let merged = Arc::new(merge_activities(&current, batch));

        self.snapshot.send_replace(merged.clone());
        self.loaded_years.insert(year);

        match self.store.save(&merged).await {
            Ok(()) => tracing::debug!(count = merged.len(), "Cache write: activities saved"),
            Err(e) => tracing::error!(error = %e, "Failed to write activity cache"),
        }
    }

    // ─── Reads ───────────────────────────────────────────────────────────────

    /// All cached activities, newest first.
    pub async fn all_activities(&self) -> Arc<Vec<Activity>> {
        self.ensure_data_loaded(self.current_year(), false).await;
        self.snapshot()
    }

    /// Activities of the week containing `start`, newest first.
    pub async fn activities_for_week(&self, start: NaiveDate) -> Vec<Activity> {
        self.ensure_week_loaded(start).await;
        aggregation::activities_in_week(&self.snapshot(), start)
    }

    pub async fn weekly_summary(&self, start: NaiveDate) -> WeeklySummary {
        self.ensure_week_loaded(start).await;
        aggregation::weekly_summary(&self.snapshot(), start)
    }

    /// Summaries for every week with activity, newest first.
    pub async fn weekly_summaries(&self) -> Vec<WeeklySummary> {
        self.ensure_data_loaded(self.current_year(), false).await;
        aggregation::weekly_summaries(&self.snapshot())
    }

    pub async fn monthly_summary(&self, year: i32, month: u32) -> Option<MonthlySummary> {
        self.ensure_data_loaded(year, false).await;
        aggregation::monthly_summary(&self.snapshot(), year, month)
    }

    pub async fn yearly_summary(&self, year: i32) -> YearlySummary {
        self.ensure_data_loaded(year, false).await;
        aggregation::yearly_summary(&self.snapshot(), year)
    }

    /// A week can straddle New Year; load both years it touches.
    async fn ensure_week_loaded(&self, start: NaiveDate) {
        let monday = week_start(start);
        let sunday = monday + Duration::days(6);

        self.ensure_data_loaded(monday.year(), false).await;
        if sunday.year() != monday.year() {
            self.ensure_data_loaded(sunday.year(), false).await;
        }
    }

    // ─── Detail ──────────────────────────────────────────────────────────────

    /// Laps and chart series for a cached activity.
    ///
    /// `None` if the id is not cached (no network call is made) or if the
    /// splits could not be fetched.
    pub async fn activity_detail(&self, id: &str) -> Option<ActivityDetail> {
        self.ensure_cache_loaded().await;

        let summary = self.snapshot().iter().find(|a| a.id == id).cloned()?;

        let Ok(activity_id) = summary.id.parse::<u64>() else {
            tracing::warn!(activity_id = %summary.id, "Activity id is not numeric");
            return None;
        };

        if !self.ensure_session().await {
            return None;
        }

        let token = self.session().token();
        match self.client.get_activity_splits(&token, activity_id).await {
            Ok(splits) => Some(build_detail(summary, &splits)),
            Err(e) => {
                if e.is_unauthorized() {
                    tracing::warn!(activity_id, "Session rejected fetching splits; logging in again");
                    self.auth.relogin(&token).await;
                } else {
                    tracing::error!(activity_id, error = %e, "Failed to fetch splits");
                }
                None
            }
        }
    }
}

/// Merge `incoming` into `existing` by id (incoming wins), newest first.
pub fn merge_activities(existing: &[Activity], incoming: Vec<Activity>) -> Vec<Activity> {
    let mut by_id: HashMap<String, Activity> = existing
        .iter()
        .map(|a| (a.id.clone(), a.clone()))
        .collect();

    for activity in incoming {
        by_id.insert(activity.id.clone(), activity);
    }

    let mut merged: Vec<Activity> = by_id.into_values().collect();
    merged.sort_by(|a, b| {
        b.start_time
            .cmp(&a.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SwimType;

    fn swim(id: &str, day: u32, distance: u32) -> Activity {
        Activity {
            id: id.to_string(),
            swim_type: SwimType::Pool,
            activity_name: None,
            start_time: NaiveDate::from_ymd_opt(2024, 5, day)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap(),
            distance_meters: distance,
            duration_seconds: 1800,
            calories: 300,
            avg_pace_seconds_per_100m: 120,
            avg_heart_rate: None,
            swolf: None,
            total_strokes: None,
        }
    }

    #[test]
    fn test_merge_dedups_and_sorts() {
        let existing = vec![swim("1", 1, 1000), swim("2", 3, 1000)];
        let incoming = vec![swim("2", 3, 2500), swim("3", 2, 800), swim("3", 2, 900)];

        let merged = merge_activities(&existing, incoming);

        let ids: Vec<&str> = merged.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        assert_eq!(merged[0].distance_meters, 2500);
        assert_eq!(merged[1].distance_meters, 900);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_activities(&[], Vec::new()).is_empty());
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(clock.current_year(), 2025);
    }

    #[test]
    fn test_status_json() {
        let json = serde_json::to_value(SyncStatus::Loading { year: 2024 }).unwrap();
        assert_eq!(json, serde_json::json!({"state": "loading", "year": 2024}));
        let json = serde_json::to_value(SyncStatus::Idle).unwrap();
        assert_eq!(json, serde_json::json!({"state": "idle"}));
    }

    #[tokio::test]
    async fn test_load_more_below_floor_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: dir.path().to_path_buf(),
            email: None,
            min_history_year: 2025,
            ..Config::default()
        };
        let engine = SyncEngine::from_config(
            &config,
            Arc::new(crate::services::auth::ConfigCredentials::new(&config)),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())),
        )
        .unwrap();

        engine.load_more().await;

        assert!(engine.loaded_years().is_empty());
        assert_eq!(engine.status(), SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_without_credentials_serves_disk_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: dir.path().to_path_buf(),
            email: None,
            ..Config::default()
        };
        ActivityStore::new(config.cache_file())
            .save(&[swim("1", 1, 1000), swim("2", 9, 1500)])
            .await
            .unwrap();

        let engine = SyncEngine::from_config(
            &config,
            Arc::new(crate::services::auth::ConfigCredentials::new(&config)),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())),
        )
        .unwrap();

        let all = engine.all_activities().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "2");
        assert_eq!(engine.loaded_years(), vec![2024]);
        assert_eq!(engine.status(), SyncStatus::Unauthenticated);
    }
}
