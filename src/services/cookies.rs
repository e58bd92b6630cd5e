// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory cookie store shared by every request of the Garmin client.
//!
//! Cookies are keyed by (name, domain, path): saving a cookie replaces any
//! previous one with the same key. Expired cookies are dropped lazily the
//! next time the store is read. Nothing is persisted; losing the store just
//! means logging in again.

use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::header::HeaderValue;
use reqwest::Url;

/// Storage key: a cookie is replaced only by one with the same triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CookieKey {
    name: String,
    domain: String,
    path: String,
}

/// A cookie accepted from a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    /// Lower-cased domain without a leading dot
    pub domain: String,
    /// No `Domain` attribute was sent: only the exact host matches
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
    /// `None` for session cookies
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    /// Parse a `Set-Cookie` header value received from `url`.
    ///
    /// Returns `None` for malformed headers and for cookies whose `Domain`
    /// attribute does not cover the responding host.
    pub fn parse(header: &str, url: &Url, now: DateTime<Utc>) -> Option<Self> {
        let cookie = Cookie::parse(header.to_string()).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();

        let (domain, host_only) = match cookie.domain() {
            Some(d) if !d.trim_start_matches('.').is_empty() => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                if !domain_match(&host, &d) {
                    return None;
                }
                (d, false)
            }
            _ => (host, true),
        };

        let path = match cookie.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url.path()),
        };

        // Max-Age wins over Expires
        let expires_at = if let Some(max_age) = cookie.max_age() {
            let secs = max_age.whole_seconds();
            if secs <= 0 {
                Some(now)
            } else {
                Some(now + chrono::Duration::seconds(secs))
            }
        } else {
            cookie.expires_datetime().and_then(offset_to_utc)
        };

        Some(Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain,
            host_only,
            path,
            secure: cookie.secure().unwrap_or(false),
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// Standard domain/path/secure scoping against a request URL.
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_match(&host, &self.domain)
        };

        domain_ok && path_match(url.path(), &self.path) && (!self.secure || url.scheme() == "https")
    }

    fn key(&self) -> CookieKey {
        CookieKey {
            name: self.name.clone(),
            domain: self.domain.clone(),
            path: self.path.clone(),
        }
    }
}

/// Thread-safe cookie store.
#[derive(Debug, Default)]
pub struct CookieStore {
    cookies: DashMap<CookieKey, StoredCookie>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge cookies from `Set-Cookie` header values received from `url`.
    ///
    /// Returns the number of cookies accepted.
    pub fn save<I, S>(&self, url: &Url, set_cookie_headers: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.save_at(url, set_cookie_headers, Utc::now())
    }

    pub fn save_at<I, S>(&self, url: &Url, set_cookie_headers: I, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut accepted = 0;
        for header in set_cookie_headers {
            match StoredCookie::parse(header.as_ref(), url, now) {
                Some(cookie) => {
                    self.insert(cookie);
                    accepted += 1;
                }
                None => tracing::debug!(host = ?url.host_str(), "Rejected Set-Cookie header"),
            }
        }
        accepted
    }

    /// Insert a cookie, replacing any with the same (name, domain, path).
    pub fn insert(&self, cookie: StoredCookie) {
        self.cookies.insert(cookie.key(), cookie);
    }

    /// All live cookies for `url`, longest path first.
    pub fn load(&self, url: &Url) -> Vec<StoredCookie> {
        self.load_at(url, Utc::now())
    }

    pub fn load_at(&self, url: &Url, now: DateTime<Utc>) -> Vec<StoredCookie> {
        self.cookies.retain(|_, cookie| !cookie.is_expired(now));

        let mut matching: Vec<StoredCookie> = self
            .cookies
            .iter()
            .filter(|entry| entry.value().matches(url))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&self) {
        self.cookies.clear();
    }
}

impl reqwest::cookie::CookieStore for CookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&str> = cookie_headers.filter_map(|v| v.to_str().ok()).collect();
        self.save(url, headers);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .load(url)
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

/// Convert the cookie crate's `time` timestamp to chrono.
fn offset_to_utc(at: time::OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(at.unix_timestamp(), at.nanosecond())
}

/// RFC 6265 domain-match. IP addresses only match exactly.
fn domain_match(host: &str, domain: &str) -> bool {
    if host == domain {
        return true;
    }
    let is_ip = host.parse::<std::net::IpAddr>().is_ok() || host.starts_with('[');
    !is_ip
        && host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

/// RFC 6265 path-match.
fn path_match(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// RFC 6265 default-path: the request path up to its last `/`.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}
