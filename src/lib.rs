// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Swim-Tracker: local cache of swim activities from Garmin Connect
//!
//! This crate logs in through the Connect web SSO flow, syncs swim
//! activities one calendar year at a time into a JSON cache, and serves
//! weekly / monthly / yearly rollups and per-activity detail over a small
//! local JSON API.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::SyncEngine;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub engine: Arc<SyncEngine>,
}
