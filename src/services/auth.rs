// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SSO login flow.
//!
//! Six remote steps, all through one cookie-sharing client:
//! 1. GET the sign-in page and scrape the form CSRF token
//! 2. POST credentials (redirects followed)
//! 3. Find the `ST-` service ticket in the final URL or the body
//! 4. If a ticket was found, GET the application with it so it sets
//!    session cookies
//! 5. GET the dashboard and scrape the Connect token
//! 6. Store the token in [`SessionState`]
//!
//! Each step depends on the one before; a failure anywhere aborts the
//! attempt and leaves the previous session token untouched.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{AuthError, RemoteError};
use crate::services::garmin::GarminClient;
use crate::services::session::SessionState;
use crate::services::token::{
    extract_connect_token, extract_csrf_token, extract_ticket_from_body, extract_ticket_from_url,
};

/// Account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of the stored account credentials.
pub trait CredentialsProvider: Send + Sync {
    /// `None` when no credentials are stored.
    fn credentials(&self) -> Option<Credentials>;
}

/// Credentials taken from the loaded [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigCredentials {
    credentials: Option<Credentials>,
}

impl ConfigCredentials {
    pub fn new(config: &Config) -> Self {
        let credentials = match (&config.email, &config.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(Credentials {
                    email: email.clone(),
                    password: password.clone(),
                })
            }
            _ => None,
        };
        Self { credentials }
    }
}

impl CredentialsProvider for ConfigCredentials {
    fn credentials(&self) -> Option<Credentials> {
        self.credentials.clone()
    }
}

/// Runs the login flow and records the resulting session token.
pub struct Authenticator {
    client: GarminClient,
    session: Arc<SessionState>,
    credentials: Arc<dyn CredentialsProvider>,
    /// Serializes concurrent re-logins
    login_lock: Mutex<()>,
}

impl Authenticator {
    pub fn new(
        client: GarminClient,
        session: Arc<SessionState>,
        credentials: Arc<dyn CredentialsProvider>,
    ) -> Self {
        Self {
            client,
            session,
            credentials,
            login_lock: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Run the flow and report success.
    ///
    /// Failures are logged, never raised. On failure the session token keeps
    /// whatever value it had before.
    pub async fn login(&self) -> bool {
        let _guard = self.login_lock.lock().await;
        self.login_locked().await
    }

    /// Log in only if there is no session yet.
    pub async fn ensure_session(&self) -> bool {
        if self.session.has_session() {
            return true;
        }
        self.relogin("").await
    }

    /// Re-run the login unless another task already replaced `stale_token`.
    ///
    /// Used after an authenticated call is rejected: several tasks may see
    /// the same rejection, but only the first one should hit the SSO host.
    pub async fn relogin(&self, stale_token: &str) -> bool {
        let _guard = self.login_lock.lock().await;

        // Double-check: another task may have logged in while we waited
        let current = self.session.token();
        if !current.is_empty() && current != stale_token {
            tracing::debug!("Session already renewed by another task");
            return true;
        }

        self.login_locked().await
    }

    async fn login_locked(&self) -> bool {
        match self.try_login().await {
            Ok(_) => true,
            Err(AuthError::MissingCredentials) => {
                tracing::warn!("Login skipped: no stored credentials");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Login failed");
                false
            }
        }
    }

    /// Run the flow, returning the new Connect token.
    pub async fn try_login(&self) -> Result<String, AuthError> {
        let credentials = self
            .credentials
            .credentials()
            .ok_or(AuthError::MissingCredentials)?;

        // ─── Step 1: login form CSRF ───
        let sso_page = self.client.get_sso_page().await?;
        let csrf = extract_csrf_token(&sso_page).ok_or(RemoteError::Extraction("_csrf"))?;
        tracing::debug!("SSO CSRF token found");

        // ─── Step 2: submit credentials ───
        let login = self
            .client
            .submit_login(&credentials.email, &credentials.password, &csrf)
            .await?;

        // ─── Step 3: service ticket ───
        let ticket = extract_ticket_from_url(&login.final_url)
            .or_else(|| extract_ticket_from_body(&login.body));

        // ─── Step 4: ticket exchange ───
        // Without a ticket the redirects may already have set the session
        // cookies; the dashboard decides whether the login took.
        match ticket {
            Some(ticket) => {
                tracing::debug!("Service ticket received");
                self.client.exchange_ticket(&ticket).await?;
            }
            None => tracing::debug!("No service ticket in login response"),
        }

        // ─── Step 5: Connect token ───
        let dashboard = self.client.get_dashboard().await?;
        let token =
            extract_connect_token(&dashboard).ok_or(RemoteError::Extraction("connect token"))?;

        // ─── Step 6: publish ───
        self.session.set_token(token.clone());
        tracing::info!("Login succeeded");

        Ok(token)
    }
}
