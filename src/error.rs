//! Error taxonomy for the sync lifecycle
//!
//! Request-time failures (`SyncRequestError`) surface synchronously to the
//! caller and are never retried automatically. Poll-time failures
//! (`PollError`) are recovered locally and retried on the next tick, so they
//! never reach consumers from the poll loop itself.

use thiserror::Error;

/// Failure talking to the aggregation service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection, DNS, or other transport-level failure from the HTTP client.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status code.
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded as the expected JSON shape.
    #[error("failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A record from the backend failed construction validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `sync_item_count` exceeded `sync_total_items` while both were positive.
    #[error("sync item count {count} exceeds total {total}")]
    CountExceedsTotal { count: u64, total: u64 },
}

/// Failure of a `request_sync` call, surfaced to the caller.
#[derive(Debug, Error)]
pub enum SyncRequestError {
    /// The owner/name pair was malformed; rejected before any network call.
    #[error("invalid repository identity {given:?}: expected non-empty owner and name without '/'")]
    InvalidIdentity { given: String },

    /// Another start-sync round trip is still outstanding.
    #[error("a sync request is already in flight")]
    AlreadyInFlight,

    /// The start-sync call itself failed.
    #[error("start-sync request failed: {0}")]
    Backend(#[from] BackendError),

    /// The backend acknowledged with a record that fails validation.
    #[error("backend acknowledged with an invalid record: {0}")]
    InvalidRecord(#[from] InvariantViolation),
}

/// A list-repositories poll failed. Logged and retried on the next tick;
/// the registry is left unchanged.
#[derive(Debug, Error)]
#[error("repository list poll failed: {source}")]
pub struct PollError {
    #[from]
    pub source: BackendError,
}
