// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fake of the Garmin SSO + Connect endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use swim_tracker::config::Config;
use swim_tracker::routes::create_router;
use swim_tracker::services::{ConfigCredentials, FixedClock, SyncEngine};
use swim_tracker::AppState;

pub const EMAIL: &str = "swimmer@example.com";
pub const PASSWORD: &str = "test_password";
const SSO_CSRF: &str = "sso-csrf-7f3a";

/// How the fake SSO hands out the service ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum TicketMode {
    /// `var response_url = "...ticket=ST-..."` in the login response body
    Body,
    /// 302 to `/modern?ticket=ST-...`
    Redirect,
    /// Session cookie set directly on the login response, no ticket at all
    CookieOnly,
}

/// Per-endpoint hit counters and behaviour switches.
pub struct FakeState {
    pub sso_page_hits: AtomicUsize,
    pub login_hits: AtomicUsize,
    pub exchange_hits: AtomicUsize,
    pub dashboard_hits: AtomicUsize,
    pub search_hits: AtomicUsize,
    pub splits_hits: AtomicUsize,

    pub ticket_mode: Mutex<TicketMode>,
    /// Serve a sign-in page without any CSRF token
    pub hide_csrf: AtomicBool,
    /// Reject every proxy API call with 401
    pub reject_api: AtomicBool,

    /// Every activity the fake account holds
    pub activities: Mutex<Vec<Value>>,
    pub splits: Mutex<Value>,
    /// `startDate` of each search request, in arrival order
    pub searched_windows: Mutex<Vec<String>>,

    logins: AtomicUsize,
    current_token: Mutex<String>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            sso_page_hits: AtomicUsize::new(0),
            login_hits: AtomicUsize::new(0),
            exchange_hits: AtomicUsize::new(0),
            dashboard_hits: AtomicUsize::new(0),
            search_hits: AtomicUsize::new(0),
            splits_hits: AtomicUsize::new(0),
            ticket_mode: Mutex::new(TicketMode::Body),
            hide_csrf: AtomicBool::new(false),
            reject_api: AtomicBool::new(false),
            activities: Mutex::new(Vec::new()),
            splits: Mutex::new(json!({})),
            searched_windows: Mutex::new(Vec::new()),
            logins: AtomicUsize::new(0),
            current_token: Mutex::new(String::new()),
        }
    }
}

#[allow(dead_code)]
impl FakeState {
    pub fn hits(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn set_activities(&self, activities: Vec<Value>) {
        *self.activities.lock().unwrap() = activities;
    }

    pub fn push_activity(&self, activity: Value) {
        self.activities.lock().unwrap().push(activity);
    }

    pub fn set_splits(&self, splits: Value) {
        *self.splits.lock().unwrap() = splits;
    }

    pub fn set_ticket_mode(&self, mode: TicketMode) {
        *self.ticket_mode.lock().unwrap() = mode;
    }

    pub fn current_token(&self) -> String {
        self.current_token.lock().unwrap().clone()
    }
}

pub struct FakeGarmin {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
}

#[allow(dead_code)]
impl FakeGarmin {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());

        let app = Router::new()
            .route("/sso/signin", get(sso_page).post(sso_login))
            .route("/modern", get(ticket_exchange))
            .route("/modern/", get(dashboard))
            .route(
                "/modern/proxy/activitylist-service/activities/search/activities",
                get(search),
            )
            .route(
                "/modern/proxy/activity-service/activity/{id}/splits",
                get(splits),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake server");
        });

        Self { addr, state }
    }

    pub fn config(&self, cache_dir: &std::path::Path) -> Config {
        Config {
            sso_url: format!("http://{}/sso", self.addr),
            connect_url: format!("http://{}/modern", self.addr),
            email: Some(EMAIL.to_string()),
            password: Some(PASSWORD.to_string()),
            cache_dir: cache_dir.to_path_buf(),
            ..Config::default()
        }
    }

    /// Engine against this fake with "today" fixed at `today`.
    pub fn engine(&self, config: &Config, today: NaiveDate) -> Arc<SyncEngine> {
        Arc::new(
            SyncEngine::from_config(
                config,
                Arc::new(ConfigCredentials::new(config)),
                Arc::new(FixedClock(today)),
            )
            .expect("engine"),
        )
    }
}

/// Router plus state over `engine`.
#[allow(dead_code)]
pub fn create_test_app(config: Config, engine: Arc<SyncEngine>) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState { config, engine });
    (create_router(state.clone()), state)
}

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Search-endpoint record for a swim.
#[allow(dead_code)]
pub fn swim_record(id: u64, start: &str, distance: f64, speed: f64) -> Value {
    json!({
        "activityId": id,
        "activityName": "Pool Swim",
        "startTimeLocal": start,
        "duration": distance / speed,
        "distance": distance,
        "calories": distance / 5.0,
        "averageHR": 132.0,
        "averageSpeed": speed,
        "averageSwolf": 38.0,
        "strokes": distance / 2.5,
        "poolLength": 25.0,
        "activityType": {"typeKey": "lap_swimming", "typeId": 27}
    })
}

/// Search-endpoint record for a non-swim.
#[allow(dead_code)]
pub fn run_record(id: u64, start: &str) -> Value {
    json!({
        "activityId": id,
        "activityName": "Evening Run",
        "startTimeLocal": start,
        "duration": 1800.0,
        "distance": 5000.0,
        "activityType": {"typeKey": "running", "typeId": 1}
    })
}

// ─── Handlers ────────────────────────────────────────────────

async fn sso_page(
    State(state): State<Arc<FakeState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.sso_page_hits.fetch_add(1, Ordering::SeqCst);

    if !query.contains_key("service") {
        return (StatusCode::BAD_REQUEST, "missing service").into_response();
    }

    if state.hide_csrf.load(Ordering::SeqCst) {
        return Html("<html><body>Service temporarily unavailable</body></html>").into_response();
    }

    Html(format!(
        r#"<html><body><form method="post">
            <input type="hidden" id="csrf" name="_csrf" value="{SSO_CSRF}">
            <input name="username"><input name="password" type="password">
        </form></body></html>"#
    ))
    .into_response()
}

async fn sso_login(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.login_hits.fetch_add(1, Ordering::SeqCst);

    let valid = form.get("_csrf").map(String::as_str) == Some(SSO_CSRF)
        && form.get("username").map(String::as_str) == Some(EMAIL)
        && form.get("password").map(String::as_str) == Some(PASSWORD)
        && form.get("embed").map(String::as_str) == Some("true");

    if !valid {
        return Html("<html><body>Invalid sign in</body></html>").into_response();
    }

    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    let ticket = format!("ST-{n:04}-fakeTicket-cas");

    let mode = *state.ticket_mode.lock().unwrap();
    match mode {
        TicketMode::Body => Html(format!(
            r#"<html><script>
                var redirectAfterAccountLoginUrl = "http://connect/modern";
                var response_url = "http://connect/modern?ticket={ticket}";
            </script></html>"#
        ))
        .into_response(),
        TicketMode::Redirect => Redirect::to(&format!("/modern?ticket={ticket}")).into_response(),
        TicketMode::CookieOnly => (
            [(
                header::SET_COOKIE,
                format!("SESSIONID=sess-{ticket}; Path=/; HttpOnly"),
            )],
            Html("<html><body>Signed in</body></html>"),
        )
            .into_response(),
    }
}

async fn ticket_exchange(
    State(state): State<Arc<FakeState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.exchange_hits.fetch_add(1, Ordering::SeqCst);

    match query.get("ticket") {
        Some(ticket) if ticket.starts_with("ST-") => (
            [(
                header::SET_COOKIE,
                format!("SESSIONID=sess-{ticket}; Path=/; HttpOnly"),
            )],
            Html("<html>Redirecting</html>"),
        )
            .into_response(),
        _ => Html("<html>Sign in required</html>").into_response(),
    }
}

async fn dashboard(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.dashboard_hits.fetch_add(1, Ordering::SeqCst);

    if !has_session_cookie(&headers) {
        return Html("<html>Sign in required</html>").into_response();
    }

    let token = format!(
        "connect-token-{}",
        state.logins.load(Ordering::SeqCst)
    );
    *state.current_token.lock().unwrap() = token.clone();

    Html(format!(
        r#"<html><head><script>window.VIEWER_USERPREFERENCES = {{}};
        var CSRF_TOKEN = "{token}";</script></head></html>"#
    ))
    .into_response()
}

async fn search(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.search_hits.fetch_add(1, Ordering::SeqCst);

    if let Err(status) = check_api_auth(&state, &headers) {
        return status.into_response();
    }

    let start_date = query.get("startDate").cloned().unwrap_or_default();
    state
        .searched_windows
        .lock()
        .unwrap()
        .push(start_date.clone());

    let year = start_date.get(..4).unwrap_or_default().to_string();
    let limit: usize = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let start: usize = query.get("start").and_then(|v| v.parse().ok()).unwrap_or(0);

    let page: Vec<Value> = state
        .activities
        .lock()
        .unwrap()
        .iter()
        .filter(|a| {
            a["startTimeLocal"]
                .as_str()
                .is_some_and(|s| s.starts_with(&year))
        })
        .skip(start)
        .take(limit)
        .cloned()
        .collect();

    Json(page).into_response()
}

async fn splits(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(_id): Path<u64>,
) -> Response {
    state.splits_hits.fetch_add(1, Ordering::SeqCst);

    if let Err(status) = check_api_auth(&state, &headers) {
        return status.into_response();
    }

    Json(state.splits.lock().unwrap().clone()).into_response()
}

fn has_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("SESSIONID=sess-ST-"))
}

fn check_api_auth(state: &FakeState, headers: &HeaderMap) -> Result<(), StatusCode> {
    if state.reject_api.load(Ordering::SeqCst) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if !has_session_cookie(headers) {
        return Err(StatusCode::FORBIDDEN);
    }

    let token = headers
        .get("connect-csrf-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if token.is_empty() || token != state.current_token() {
        return Err(StatusCode::FORBIDDEN);
    }
    if headers.get("sec-fetch-mode").and_then(|v| v.to_str().ok()) != Some("cors") {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(())
}
