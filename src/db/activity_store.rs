// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-file JSON store for the activity cache.
//!
//! The whole collection is rewritten after every successful year fetch.
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous cache intact.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::Activity;

/// On-disk activity collection.
#[derive(Debug, Clone)]
pub struct ActivityStore {
    path: PathBuf,
}

impl ActivityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted collection.
    ///
    /// Returns `Ok(None)` when no cache file exists yet.
    pub async fn load(&self) -> Result<Option<Vec<Activity>>, StoreError> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let activities: Vec<Activity> = serde_json::from_slice(&content)?;
        Ok(Some(activities))
    }

    /// Replace the persisted collection.
    pub async fn save(&self, activities: &[Activity]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_vec(activities)?;
        let temp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&temp_path, content).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            // Don't leave a stray temp file behind
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }
}
