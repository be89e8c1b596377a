//! Session identity.
//!
//! A session is named by the local timestamp at which it started, rendered as
//! `YYYYMMDD_HHMMSS` (e.g. `20241126_100200`). The same string names the
//! session's local directory and its remote folder, and lexicographic order
//! equals chronological order, so sorted listings come out in start order for
//! free.

use std::fmt;
use std::str::FromStr;

use bridge_traits::time::Clock;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

const SESSION_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Sortable, timestamp-derived session identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a new id from the current clock reading.
    pub fn generate(clock: &dyn Clock) -> Self {
        SessionId(clock.now().format(SESSION_ID_FORMAT).to_string())
    }

    /// Parse and validate a candidate id.
    ///
    /// Names that are not exactly `YYYYMMDD_HHMMSS` are rejected; directory
    /// scans use this to skip unrelated entries.
    pub fn parse(raw: &str) -> Result<Self> {
        NaiveDateTime::parse_from_str(raw, SESSION_ID_FORMAT)
            .map_err(|_| SyncError::InvalidSessionId(raw.to_string()))?;
        Ok(SessionId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The timestamp this id encodes. `None` only for ids constructed
    /// through deserialization of foreign data.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, SESSION_ID_FORMAT).ok()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        SessionId::parse(s)
    }
}
