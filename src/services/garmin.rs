// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garmin Connect web client.
//!
//! There is no public API, so this drives the same endpoints a browser does:
//! - SSO sign-in page and credential form
//! - Service-ticket exchange and dashboard page
//! - The Connect proxy for activity search and splits
//!
//! Every request looks like it came from desktop Chrome. Proxy API calls
//! carry fetch-metadata and client-hint headers; SSO calls carry the
//! navigation variants.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::Deserialize;

use crate::config::Config;
use crate::error::RemoteError;
use crate::models::{pace_from_speed, Activity, SwimType};
use crate::services::cookies::CookieStore;
use crate::time_utils::parse_local_datetime;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7";
const SEC_CH_UA: &str = r#""Google Chrome";v="143", "Chromium";v="143", "Not A(Brand";v="24""#;

/// Header sent with the session token on proxy API calls.
pub const CONNECT_TOKEN_HEADER: &str = "connect-csrf-token";

/// Remote activity types kept by the sync.
pub const SWIM_TYPE_KEYS: &[&str] = &["swimming", "lap_swimming", "open_water_swimming"];

/// Which browser header set a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Top-level navigation on the SSO host
    Sso,
    /// XHR-style call to the Connect application/API host
    Connect,
}

/// Low-level client for the SSO and Connect hosts.
#[derive(Clone)]
pub struct GarminClient {
    http: reqwest::Client,
    sso_url: String,
    connect_url: String,
}

impl GarminClient {
    /// Create a client sharing `cookies` across every request and redirect.
    pub fn new(config: &Config, cookies: Arc<CookieStore>) -> Result<Self, RemoteError> {
        let mut defaults = HeaderMap::new();
        defaults.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(BROWSER_ACCEPT),
        );
        defaults.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
        );
        defaults.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(defaults)
            .cookie_provider(cookies)
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(config.http_timeout)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            sso_url: config.sso_url.trim_end_matches('/').to_string(),
            connect_url: config.connect_url.trim_end_matches('/').to_string(),
        })
    }

    // ─── SSO ─────────────────────────────────────────────────────────────────

    /// Fetch the SSO sign-in page (source of the login-form CSRF token).
    pub async fn get_sso_page(&self) -> Result<String, RemoteError> {
        let response = self
            .http
            .get(self.signin_url())
            .query(&self.sso_query())
            .headers(self.profile_headers(HeaderProfile::Sso))
            .send()
            .await?;

        let response = check_response(response).await?;
        Ok(response.text().await?)
    }

    /// Submit credentials to the SSO form.
    ///
    /// Redirects are followed, so the returned URL may already carry the
    /// service ticket.
    pub async fn submit_login(
        &self,
        email: &str,
        password: &str,
        csrf_token: &str,
    ) -> Result<LoginResponse, RemoteError> {
        let mut headers = self.profile_headers(HeaderProfile::Sso);
        if let Some(origin) = origin_of(&self.sso_url) {
            if let Ok(value) = HeaderValue::from_str(&origin) {
                headers.insert(reqwest::header::ORIGIN, value);
            }
        }

        let response = self
            .http
            .post(self.signin_url())
            .query(&self.sso_query())
            .headers(headers)
            .form(&[
                ("username", email),
                ("password", password),
                ("embed", "true"),
                ("_csrf", csrf_token),
            ])
            .send()
            .await?;

        let response = check_response(response).await?;
        let final_url = response.url().clone();
        let body = response.text().await?;
        Ok(LoginResponse { final_url, body })
    }

    /// Hit the application with a service ticket so it issues session cookies.
    pub async fn exchange_ticket(&self, ticket: &str) -> Result<(), RemoteError> {
        let url = format!("{}?ticket={}", self.connect_url, urlencoding::encode(ticket));
        let response = self
            .http
            .get(url)
            .headers(self.profile_headers(HeaderProfile::Sso))
            .send()
            .await?;

        check_response(response).await?;
        Ok(())
    }

    /// Fetch the authenticated dashboard page (source of the Connect token).
    pub async fn get_dashboard(&self) -> Result<String, RemoteError> {
        let response = self
            .http
            .get(format!("{}/", self.connect_url))
            .headers(self.profile_headers(HeaderProfile::Sso))
            .send()
            .await?;

        let response = check_response(response).await?;
        Ok(response.text().await?)
    }

    // ─── Proxy API ───────────────────────────────────────────────────────────

    /// One page of the activity search.
    pub async fn search_activities(
        &self,
        connect_token: &str,
        search: &ActivitySearch,
    ) -> Result<Vec<ActivityDto>, RemoteError> {
        let url = format!(
            "{}/proxy/activitylist-service/activities/search/activities",
            self.connect_url
        );

        let response = self
            .http
            .get(url)
            .headers(self.api_headers(connect_token))
            .query(&[
                ("activityType", search.activity_type.clone()),
                ("startDate", search.start_date.clone()),
                ("endDate", search.end_date.clone()),
                ("limit", search.limit.to_string()),
                ("start", search.start.to_string()),
                ("excludeChildren", "false".to_string()),
            ])
            .send()
            .await?;

        check_response_json(response).await
    }

    /// Lap and length records for one activity.
    pub async fn get_activity_splits(
        &self,
        connect_token: &str,
        activity_id: u64,
    ) -> Result<SplitsResponse, RemoteError> {
        let url = format!(
            "{}/proxy/activity-service/activity/{}/splits",
            self.connect_url, activity_id
        );

        let response = self
            .http
            .get(url)
            .headers(self.api_headers(connect_token))
            .send()
            .await?;

        check_response_json(response).await
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    fn signin_url(&self) -> String {
        format!("{}/signin", self.sso_url)
    }

    fn sso_query(&self) -> Vec<(&'static str, String)> {
        let source = origin_of(&self.connect_url)
            .map(|origin| format!("{origin}/signin"))
            .unwrap_or_else(|| self.connect_url.clone());

        vec![
            ("service", self.connect_url.clone()),
            ("webauth-html", "true".to_string()),
            ("webauth-urls", "true".to_string()),
            ("gauth-host", self.sso_url.clone()),
            ("source", source),
            ("redirectAfterAccountLoginUrl", self.connect_url.clone()),
        ]
    }

    fn api_headers(&self, connect_token: &str) -> HeaderMap {
        let mut headers = self.profile_headers(HeaderProfile::Connect);
        if let Ok(value) = HeaderValue::from_str(connect_token) {
            headers.insert(HeaderName::from_static(CONNECT_TOKEN_HEADER), value);
        }
        headers
    }

    /// Browser headers layered on top of the client defaults.
    pub fn profile_headers(&self, profile: HeaderProfile) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let mut set = |name: &'static str, value: &'static str| {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        };

        match profile {
            HeaderProfile::Connect => {
                set("accept", "*/*");
                set("accept-language", "en,und;q=0.9,zh-CN;q=0.8,zh;q=0.7,ja;q=0.6");
                set("priority", "u=1, i");
                set("sec-ch-ua", SEC_CH_UA);
                set("sec-ch-ua-mobile", "?0");
                set("sec-ch-ua-platform", "\"macOS\"");
                set("sec-fetch-dest", "empty");
                set("sec-fetch-mode", "cors");
                set("sec-fetch-site", "same-origin");
                if let Ok(referer) = HeaderValue::from_str(&format!("{}/", self.connect_url)) {
                    headers.insert(reqwest::header::REFERER, referer);
                }
            }
            HeaderProfile::Sso => {
                set("nk", "NT");
                set("sec-fetch-dest", "document");
                set("sec-fetch-mode", "navigate");
                set("sec-fetch-site", "none");
                set("sec-fetch-user", "?1");
                set("upgrade-insecure-requests", "1");
            }
        }
        headers
    }
}

/// `scheme://host[:port]` of a base URL.
fn origin_of(base: &str) -> Option<String> {
    let url = Url::parse(base).ok()?;
    Some(url.origin().ascii_serialization())
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!("Garmin rate limit hit (429)");
        return Err(RemoteError::RateLimited);
    }

    // Session cookies or connect token no longer accepted
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(RemoteError::Unauthorized);
    }

    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, RemoteError> {
    let response = check_response(response).await?;
    response
        .json()
        .await
        .map_err(|e| RemoteError::Parse(format!("JSON parse error: {}", e)))
}

/// Result of the credential submission after redirects.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    /// URL the client ended on after following redirects
    pub final_url: Url,
    pub body: String,
}

/// Parameters of one activity search page.
#[derive(Debug, Clone)]
pub struct ActivitySearch {
    pub activity_type: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
    pub limit: u32,
    /// Offset of the first record
    pub start: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Activity record from the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDto {
    pub activity_id: u64,
    #[serde(default)]
    pub activity_name: Option<String>,
    /// `yyyy-MM-dd HH:mm:ss`
    #[serde(default)]
    pub start_time_local: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default, rename = "averageHR")]
    pub average_hr: Option<f64>,
    /// m/s
    #[serde(default)]
    pub average_speed: Option<f64>,
    #[serde(default)]
    pub average_swolf: Option<f64>,
    #[serde(default)]
    pub strokes: Option<f64>,
    #[serde(default)]
    pub activity_type: Option<ActivityTypeDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTypeDto {
    #[serde(default)]
    pub type_key: Option<String>,
}

impl ActivityDto {
    fn type_key(&self) -> Option<&str> {
        self.activity_type.as_ref()?.type_key.as_deref()
    }

    /// Whether the remote classifies this record as a swim.
    pub fn is_swim(&self) -> bool {
        self.type_key().is_some_and(|k| SWIM_TYPE_KEYS.contains(&k))
    }

    /// Map to the cached shape. `None` if the start time is unusable.
    pub fn to_activity(&self) -> Option<Activity> {
        let start_time = parse_local_datetime(self.start_time_local.as_deref()?)?;
        let swim_type = match self.type_key() {
            Some("open_water_swimming") => SwimType::OpenWater,
            _ => SwimType::Pool,
        };

        Some(Activity {
            id: self.activity_id.to_string(),
            swim_type,
            activity_name: self.activity_name.clone(),
            start_time,
            distance_meters: self.distance.map(|d| d as u32).unwrap_or(0),
            duration_seconds: self.duration.map(|d| d as u64).unwrap_or(0),
            calories: self.calories.map(|c| c as u32).unwrap_or(0),
            avg_pace_seconds_per_100m: pace_from_speed(self.average_speed),
            avg_heart_rate: self.average_hr.map(|v| v as u32),
            swolf: self.average_swolf.map(|v| v as u32),
            total_strokes: self.strokes.map(|v| v as u32),
        })
    }
}

/// Splits endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SplitsResponse {
    #[serde(default, rename = "lapDTOs")]
    pub laps: Option<Vec<LapDto>>,
    #[serde(default, rename = "lengthDTOs")]
    pub lengths: Option<Vec<LengthDto>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapDto {
    #[serde(default)]
    pub lap_index: Option<u32>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub average_speed: Option<f64>,
    #[serde(default, rename = "averageHR")]
    pub average_hr: Option<f64>,
    #[serde(default, rename = "averageSWOLF")]
    pub average_swolf: Option<f64>,
    #[serde(default, rename = "totalNumberOfStrokes")]
    pub total_strokes: Option<f64>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default, rename = "lengthDTOs")]
    pub lengths: Option<Vec<LengthDto>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthDto {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub average_speed: Option<f64>,
    #[serde(default, rename = "averageSWOLF")]
    pub average_swolf: Option<f64>,
    #[serde(default, rename = "totalNumberOfStrokes")]
    pub strokes: Option<f64>,
    #[serde(default, rename = "averageHR")]
    pub average_hr: Option<f64>,
}
