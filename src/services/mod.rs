// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregation;
pub mod auth;
pub mod cookies;
pub mod detail;
pub mod garmin;
pub mod session;
pub mod sync;
pub mod token;

pub use auth::{Authenticator, ConfigCredentials, Credentials, CredentialsProvider};
pub use cookies::CookieStore;
pub use garmin::GarminClient;
pub use session::SessionState;
pub use sync::{Clock, FixedClock, SyncEngine, SyncStatus, SystemClock};
