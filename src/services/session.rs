// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Current Connect session token.
//!
//! There is no expiry tracking: a session is only known to be bad when an
//! authenticated call is rejected, at which point the login flow runs again
//! and overwrites the token.

use tokio::sync::watch;

/// Process-wide session token, last writer wins.
#[derive(Debug)]
pub struct SessionState {
    token: watch::Sender<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (token, _) = watch::channel(String::new());
        Self { token }
    }

    pub fn set_token(&self, value: impl Into<String>) {
        self.token.send_replace(value.into());
    }

    pub fn token(&self) -> String {
        self.token.borrow().clone()
    }

    pub fn has_session(&self) -> bool {
        !self.token.borrow().is_empty()
    }

    /// Observe token changes.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.token.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_by_default() {
        let session = SessionState::new();
        assert!(!session.has_session());
        assert_eq!(session.token(), "");
    }

    #[test]
    fn test_last_writer_wins() {
        let session = SessionState::new();
        session.set_token("first");
        session.set_token("second");
        assert!(session.has_session());
        assert_eq!(session.token(), "second");

        session.set_token("");
        assert!(!session.has_session());
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let session = SessionState::new();
        let mut rx = session.subscribe();

        session.set_token("connect-1");
        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow().as_str(), "connect-1");
    }
}
