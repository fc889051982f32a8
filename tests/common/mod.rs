/// Common test utilities and helpers for repopulse tests
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use repopulse::record::{RepositoryRecord, SyncStatus};

/// Builder for repository records as the aggregation service reports them
#[derive(Debug, Clone)]
pub struct RecordFixture {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub sync_status: SyncStatus,
    pub sync_item_count: u64,
    pub sync_total_items: u64,
    pub started_secs_ago: Option<i64>,
    pub last_error: Option<String>,
}

impl RecordFixture {
    pub fn new(id: i64, owner: &str, name: &str) -> Self {
        Self {
            id,
            owner: owner.to_string(),
            name: name.to_string(),
            sync_status: SyncStatus::Idle,
            sync_item_count: 0,
            sync_total_items: 0,
            started_secs_ago: None,
            last_error: None,
        }
    }

    pub fn queued(mut self) -> Self {
        self.sync_status = SyncStatus::Queued;
        self
    }

    pub fn syncing(mut self, count: u64, total: u64) -> Self {
        self.sync_status = SyncStatus::Syncing;
        self.sync_item_count = count;
        self.sync_total_items = total;
        self.started_secs_ago = Some(10);
        self
    }

    pub fn synced(mut self) -> Self {
        self.sync_status = SyncStatus::Synced;
        self.started_secs_ago = Some(0);
        self
    }

    pub fn errored(mut self, message: &str) -> Self {
        self.sync_status = SyncStatus::Error;
        self.last_error = Some(message.to_string());
        self
    }

    pub fn build(&self) -> RepositoryRecord {
        RepositoryRecord {
            id: self.id,
            owner: self.owner.clone(),
            name: self.name.clone(),
            full_name: format!("{}/{}", self.owner, self.name),
            sync_status: self.sync_status,
            sync_item_count: self.sync_item_count,
            sync_total_items: self.sync_total_items,
            last_synced_at: self
                .started_secs_ago
                .map(|secs| Utc::now() - Duration::seconds(secs)),
            last_error: self.last_error.clone(),
        }
    }

    /// The record as a JSON body in the backend's wire format
    pub fn json(&self) -> Value {
        serde_json::to_value(self.build()).expect("record serializes")
    }
}

/// JSON body for a list-repositories snapshot
pub fn snapshot(fixtures: &[RecordFixture]) -> Value {
    Value::Array(fixtures.iter().map(|f| f.json()).collect())
}

/// A list entry that fails record validation (counter over total)
pub fn corrupt_entry(id: i64) -> Value {
    json!({
        "id": id,
        "owner": "corrupt",
        "name": "entry",
        "full_name": "corrupt/entry",
        "sync_status": "syncing",
        "sync_item_count": 500,
        "sync_total_items": 10,
    })
}
