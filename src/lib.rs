//! repopulse - Repository Sync Lifecycle Client
//!
//! repopulse tracks a set of remote repositories registered with a
//! contributor-health aggregation service, drives long-running sync
//! operations against it, and keeps a local registry reconciled with the
//! backend's snapshots without redundant network traffic or spurious
//! re-publication of unchanged state.
//!
//! ## Core Features
//!
//! - **Sync lifecycle**: `idle -> queued -> syncing -> {synced, error}`
//!   state machine per tracked repository
//! - **Polling scheduler**: one timer, armed exactly while a sync is in
//!   flight, at most one list request outstanding at a time
//! - **Selection reconciliation**: wholesale snapshot replacement that
//!   preserves the user's selection and raises a change signal only when
//!   the selected record actually moved
//! - **Progress estimation**: stateless percent/ETA math from cumulative
//!   counters and wall-clock time
//!
//! ## Modules
//!
//! - [`record`]: tracked-repository data model and validation
//! - [`store`]: composition root exposed to consumers
//! - [`controller`]: start-sync requests and the poll timer
//! - [`backend`]: aggregation service API client

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod progress;
pub mod reconcile;
pub mod record;
pub mod store;

pub use backend::{AggregationBackend, AggregationClient};
pub use config::Config;
pub use controller::SyncController;
pub use error::{BackendError, InvariantViolation, PollError, SyncRequestError};
pub use progress::{estimate, RemainingTime, SyncProgress};
pub use reconcile::{reconcile, ReconcileOutcome};
pub use record::{RepositoryRecord, SyncStatus};
pub use store::RepositoryStore;
