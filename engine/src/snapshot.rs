//! Snapshot types for saving and restoring a table's filter state.
//!
//! A snapshot carries the four filter pieces (sort order, page, condition
//! filter, set filter) so a host can persist a view and bring it back
//! later. Every map in the state is a BTreeMap, so serialization is
//! deterministic.

use crate::{error::Result, pipeline::FilterState, Error};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A saved filter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSnapshot {
    pub format_version: u32,
    #[serde(flatten)]
    pub state: FilterState,
}

impl FilterSnapshot {
    pub fn new(state: FilterState) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            state,
        }
    }

    pub fn into_state(self) -> FilterState {
        self.state
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON, rejecting newer formats and broken pages.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        snapshot
            .state
            .page
            .validate()
            .map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        Ok(snapshot)
    }
}

impl From<FilterState> for FilterSnapshot {
    fn from(state: FilterState) -> Self {
        Self::new(state)
    }
}
