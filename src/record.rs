//! Repository records - the tracked-repository data model
//!
//! This module defines the snapshot of one tracked repository as the
//! aggregation service reports it: identity fields, the sync state machine
//! position, cumulative progress counters, and timestamps. Records are
//! created from backend responses and mutated only by reconciling fresh
//! snapshots; consumers receive clones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::InvariantViolation;

/// Position of a repository in the sync state machine.
///
/// `idle -> queued -> syncing -> {synced, error}`; the terminal states
/// re-enter at `queued` when a new sync is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// No sync has been requested for this record
    Idle,
    /// Accepted by the backend, waiting to be processed
    Queued,
    /// Backend is processing; progress counters are live
    Syncing,
    /// Last sync attempt completed successfully
    Synced,
    /// Last sync attempt failed (see `last_error`)
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Queued => "queued",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(SyncStatus::Idle),
            "queued" => Some(SyncStatus::Queued),
            "syncing" => Some(SyncStatus::Syncing),
            "synced" => Some(SyncStatus::Synced),
            "error" => Some(SyncStatus::Error),
            _ => None,
        }
    }

    /// Whether a record in this state requires polling for progress.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncStatus::Queued | SyncStatus::Syncing)
    }

    /// Whether this state ends the current sync attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Synced | SyncStatus::Error)
    }
}

/// One tracked remote repository and its current sync state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Stable identifier assigned by the backend on first sync
    pub id: i64,
    pub owner: String,
    pub name: String,
    /// `owner/name`; the user-facing key before an `id` exists
    pub full_name: String,
    pub sync_status: SyncStatus,
    /// Items processed so far; live only while `syncing`
    #[serde(default)]
    pub sync_item_count: u64,
    /// Total items the backend expects to process
    #[serde(default)]
    pub sync_total_items: u64,
    /// Most recent transition into `syncing` (the ETA epoch) or `synced`
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Present only when `sync_status` is `error`
    #[serde(default)]
    pub last_error: Option<String>,
}

impl RepositoryRecord {
    /// Check construction invariants.
    ///
    /// The progress counters must satisfy `sync_item_count <= sync_total_items`
    /// once a total is known. Unknown status strings are already rejected at
    /// the serde layer because [`SyncStatus`] is a closed enum.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.sync_total_items > 0 && self.sync_item_count > self.sync_total_items {
            return Err(InvariantViolation::CountExceedsTotal {
                count: self.sync_item_count,
                total: self.sync_total_items,
            });
        }
        Ok(())
    }
}

/// Decode a list snapshot tolerantly, one record at a time.
///
/// A record that fails to decode or fails validation is dropped with a
/// diagnostic; the rest of the snapshot still applies. This keeps one bad
/// record from poisoning the poll loop.
pub fn decode_snapshot(values: Vec<serde_json::Value>) -> Vec<RepositoryRecord> {
    let mut records = Vec::with_capacity(values.len());

    for value in values {
        let record: RepositoryRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(err) => {
                warn!("Dropping undecodable repository record: {}", err);
                continue;
            }
        };

        if let Err(violation) = record.validate() {
            warn!(
                "Dropping invalid repository record {}: {}",
                record.full_name, violation
            );
            continue;
        }

        records.push(record);
    }

    records
}
