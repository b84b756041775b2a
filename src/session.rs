//! Remembered frame parameters.
//!
//! The compositor never cares where a frame URL came from. This store is the
//! resolver's memory: each slug maps to the parameters it was last opened
//! with, and one slot holds a custom frame (typically a data URI) used when
//! no frame URL is supplied at all.
//!
//! ## Storage
//!
//! A pretty-printed JSON file, `.twibbon-session.json`, in the chosen state
//! directory. Loading is forgiving: a missing, corrupt or older-version file
//! yields an empty store rather than an error.

use crate::validator::is_valid_image_url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Name of the session file within the state directory.
const SESSION_FILENAME: &str = ".twibbon-session.json";

/// Bump to discard every stored session when the format changes.
const SESSION_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no frame given and none remembered")]
    NoFrame,
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// Parameters a twibbon page was opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStore {
    pub version: u32,
    #[serde(default)]
    pub sessions: BTreeMap<String, SessionParams>,
    /// Fallback frame when a request carries no frame URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_frame: Option<String>,
}

impl SessionStore {
    pub fn empty() -> Self {
        Self {
            version: SESSION_VERSION,
            sessions: BTreeMap::new(),
            custom_frame: None,
        }
    }

    /// Load from `dir`, or an empty store if the file is missing or unreadable.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(SESSION_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let store: Self = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring corrupt session file");
                return Self::empty();
            }
        };
        if store.version != SESSION_VERSION {
            return Self::empty();
        }
        store
    }

    pub fn save(&self, dir: &Path) -> Result<(), SessionError> {
        let path = dir.join(SESSION_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn get(&self, slug: &str) -> Option<&SessionParams> {
        self.sessions.get(slug)
    }

    /// Remember `params` under its slug, replacing earlier values.
    pub fn insert(&mut self, params: SessionParams) {
        self.sessions.insert(params.slug.clone(), params);
    }

    pub fn set_custom_frame(&mut self, frame: impl Into<String>) {
        self.custom_frame = Some(frame.into());
    }

    /// Pick the frame source for a request.
    ///
    /// An explicit frame must pass [`is_valid_image_url`]. Without one, the
    /// slug's remembered frame is used, then the custom frame. Remembered
    /// values are trusted as-is since they were checked when stored.
    pub fn resolve_frame(
        &self,
        frame: Option<&str>,
        slug: Option<&str>,
    ) -> Result<String, SessionError> {
        if let Some(frame) = frame {
            if !is_valid_image_url(frame) {
                return Err(SessionError::InvalidFrame(frame.to_string()));
            }
            return Ok(frame.to_string());
        }
        slug.and_then(|s| self.get(s))
            .and_then(|params| params.frame_url.clone())
            .or_else(|| self.custom_frame.clone())
            .ok_or(SessionError::NoFrame)
    }
}
