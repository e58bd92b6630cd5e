// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Security-token scraping from SSO and dashboard HTML/JS.
//!
//! The upstream markup changes shape between deployments, so each token is
//! located by an ordered list of independent strategies. The first strategy
//! that matches wins; running out of strategies is "not found", not an error.
//! Update these when the SSO or dashboard page layout changes.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

/// A single extraction attempt over raw page text.
pub type Strategy = fn(&str) -> Option<String>;

// ═══════════════════════════════════════════════════════════════════════════════
// Login Form CSRF Regexes
// ═══════════════════════════════════════════════════════════════════════════════

static RE_CSRF_NAME_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"name=["']_csrf["']\s+value=["']([^"']+)["']"#).expect("valid regex")
});
static RE_CSRF_VALUE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"value=["']([^"']+)["']\s+name=["']_csrf["']"#).expect("valid regex")
});
static RE_CSRF_INPUT_NAME_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<input[^>]*name=["']_csrf["'][^>]*value=["']([^"']+)["']"#)
        .expect("valid regex")
});
static RE_CSRF_INPUT_VALUE_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<input[^>]*value=["']([^"']+)["'][^>]*name=["']_csrf["']"#)
        .expect("valid regex")
});
static RE_CSRF_META: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<meta[^>]*name=["']csrf-token["'][^>]*content=["']([^"']+)["']"#)
        .expect("valid regex")
});

// ═══════════════════════════════════════════════════════════════════════════════
// Dashboard + Ticket Regexes
// ═══════════════════════════════════════════════════════════════════════════════

static RE_CONNECT_JS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"CSRF_TOKEN\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});
static RE_TICKET_RESPONSE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"response_url\s*=\s*["'][^"']*ticket=(ST-[^"'&\\]+)["'\\&]"#)
        .expect("valid regex")
});
static RE_TICKET_ANYWHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"ticket=(ST-[^"'&\s;\\<]+)"#).expect("valid regex"));

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|v| !v.is_empty())
}

/// `name="_csrf"` directly followed by `value="..."`.
pub fn csrf_name_then_value(html: &str) -> Option<String> {
    first_capture(&RE_CSRF_NAME_VALUE, html)
}

/// `value="..."` directly followed by `name="_csrf"`.
pub fn csrf_value_then_name(html: &str) -> Option<String> {
    first_capture(&RE_CSRF_VALUE_NAME, html)
}

/// Any `<input>` carrying both `name="_csrf"` and a `value`, in either order.
pub fn csrf_input_tag(html: &str) -> Option<String> {
    first_capture(&RE_CSRF_INPUT_NAME_FIRST, html)
        .or_else(|| first_capture(&RE_CSRF_INPUT_VALUE_FIRST, html))
}

/// `<meta name="csrf-token" content="...">`.
pub fn csrf_meta_tag(html: &str) -> Option<String> {
    first_capture(&RE_CSRF_META, html)
}

/// `CSRF_TOKEN = "..."` assignment in an inline script.
pub fn connect_js_assignment(html: &str) -> Option<String> {
    first_capture(&RE_CONNECT_JS, html)
}

/// Login-form CSRF strategies, in evaluation order.
pub const CSRF_STRATEGIES: &[(&str, Strategy)] = &[
    ("name_then_value", csrf_name_then_value),
    ("value_then_name", csrf_value_then_name),
    ("input_tag", csrf_input_tag),
    ("meta_tag", csrf_meta_tag),
];

/// Dashboard token strategies: the JS variable first, then the form shapes.
pub const CONNECT_STRATEGIES: &[(&str, Strategy)] = &[
    ("js_assignment", connect_js_assignment),
    ("name_then_value", csrf_name_then_value),
    ("value_then_name", csrf_value_then_name),
    ("input_tag", csrf_input_tag),
    ("meta_tag", csrf_meta_tag),
];

/// Run strategies in order and return the first hit.
pub fn extract_with(strategies: &[(&str, Strategy)], text: &str) -> Option<String> {
    strategies.iter().find_map(|(name, strategy)| {
        let token = strategy(text)?;
        tracing::debug!(strategy = name, "Token strategy matched");
        Some(token)
    })
}

/// CSRF token of the SSO login form.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    extract_with(CSRF_STRATEGIES, html)
}

/// Token the Connect proxy API expects in the `connect-csrf-token` header.
pub fn extract_connect_token(html: &str) -> Option<String> {
    extract_with(CONNECT_STRATEGIES, html)
}

/// Service ticket from the login response body.
///
/// The `response_url` script variable is the most reliable source; any
/// `ticket=ST-...` fragment elsewhere in the body is the fallback.
pub fn extract_ticket_from_body(body: &str) -> Option<String> {
    first_capture(&RE_TICKET_RESPONSE_URL, body)
        .or_else(|| first_capture(&RE_TICKET_ANYWHERE, body))
}

/// Service ticket from a redirect-resolved URL's query string.
pub fn extract_ticket_from_url(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "ticket")
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty())
}
