//! Sync controller - start-sync requests and the polling scheduler
//!
//! The controller owns the two mutation paths into the registry: the
//! `request_sync` round trip and the poll loop. Polling runs as a single
//! tokio task, active exactly while at least one record is queued or
//! syncing. The loop awaits each list call inline and skips missed ticks,
//! so at most one list request is ever in flight; a failed poll is logged
//! and retried on the next tick, and the loop stops itself once no record
//! needs it.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::backend::AggregationBackend;
use crate::error::{PollError, SyncRequestError};
use crate::reconcile::reconcile;
use crate::record::RepositoryRecord;
use crate::store::Shared;

/// Owns the start-sync operation and the poll timer.
pub struct SyncController {
    backend: Arc<dyn AggregationBackend>,
    shared: Arc<Shared>,
    poll_interval: Duration,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncController {
    pub(crate) fn new(
        backend: Arc<dyn AggregationBackend>,
        shared: Arc<Shared>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            backend,
            shared,
            poll_interval,
            poll_task: Mutex::new(None),
        }
    }

    /// Start (or restart) a sync for `owner/name`.
    ///
    /// The identity is validated before any network call. On success the
    /// acknowledged record is upserted by identity, becomes the selection,
    /// and polling is armed. At most one request round trip runs at a time;
    /// overlapping calls fail with [`SyncRequestError::AlreadyInFlight`].
    pub async fn request_sync(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryRecord, SyncRequestError> {
        validate_identity(owner, name)?;

        if self
            .shared
            .sync_request_active
            .swap(true, Ordering::SeqCst)
        {
            return Err(SyncRequestError::AlreadyInFlight);
        }

        let result = self.backend.start_sync(owner, name).await;
        self.shared.sync_request_active.store(false, Ordering::SeqCst);

        let record = result?;
        record.validate()?;

        {
            let mut registry = self.shared.registry.lock().unwrap();
            registry.upsert(record.clone());
            registry.selected_id = Some(record.id);
        }
        self.shared.publish_selected();
        self.ensure_polling();

        debug!(
            "Sync requested for {}: now {}",
            record.full_name,
            record.sync_status.as_str()
        );
        Ok(record)
    }

    /// Arm the poll timer if any record needs it and no loop is running.
    ///
    /// Called after every state change that can create active records; the
    /// loop itself re-checks the condition and exits when it stops holding.
    pub(crate) fn ensure_polling(&self) {
        let mut task = self.poll_task.lock().unwrap();

        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }

        if !self.shared.registry.lock().unwrap().needs_poll() {
            return;
        }

        debug!("Arming poll timer ({:?} cadence)", self.poll_interval);
        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&self.shared);
        let period = self.poll_interval;
        *task = Some(tokio::spawn(poll_loop(backend, shared, period)));
    }

    /// Tear down the poll timer. No network call is issued afterwards;
    /// syncs already queued on the backend continue server-side.
    pub fn shutdown(&self) {
        if let Some(handle) = self.poll_task.lock().unwrap().take() {
            handle.abort();
            debug!("Poll timer stopped");
        }
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Reject identities that would not form a well-formed `owner/name` pair:
/// each segment must be non-empty and free of the separator itself.
fn validate_identity(owner: &str, name: &str) -> Result<(), SyncRequestError> {
    if owner.is_empty() || name.is_empty() || owner.contains('/') || name.contains('/') {
        return Err(SyncRequestError::InvalidIdentity {
            given: format!("{}/{}", owner, name),
        });
    }
    Ok(())
}

/// Periodic list-repositories loop. One tick, one call; ticks that fire
/// while a call is outstanding are skipped rather than queued.
async fn poll_loop(
    backend: Arc<dyn AggregationBackend>,
    shared: Arc<Shared>,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // The first tick fires immediately; the cadence starts one period out
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if !shared.registry.lock().unwrap().needs_poll() {
            break;
        }

        match backend.list_repositories().await {
            Ok(fresh) => apply_snapshot(&shared, fresh, true),
            Err(err) => {
                // Transient failures retry on the next tick; the registry
                // keeps its last known state meanwhile
                warn!("{}", PollError::from(err));
            }
        }

        if !shared.registry.lock().unwrap().needs_poll() {
            break;
        }
    }

    debug!("Poll loop stopped; no repository requires polling");
}

/// Reconcile a fresh snapshot into the registry and republish the selected
/// record when it changed.
pub(crate) fn apply_snapshot(shared: &Shared, fresh: Vec<RepositoryRecord>, silent: bool) {
    let selection_moved;
    {
        let mut registry = shared.registry.lock().unwrap();
        let outcome = reconcile(fresh, &registry.records, registry.selected_id, silent);

        selection_moved =
            outcome.selected_changed.is_some() || outcome.selected_id != registry.selected_id;
        registry.records = outcome.records;
        registry.selected_id = outcome.selected_id;
    }

    if selection_moved {
        shared.publish_selected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use mockall::mock;

    use crate::error::BackendError;
    use crate::record::SyncStatus;

    mock! {
        Backend {}

        #[async_trait]
        impl AggregationBackend for Backend {
            async fn start_sync(
                &self,
                owner: &str,
                name: &str,
            ) -> Result<RepositoryRecord, BackendError>;
            async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>, BackendError>;
            async fn remove_repository(&self, id: i64) -> Result<(), BackendError>;
        }
    }

    fn controller_with(backend: MockBackend) -> SyncController {
        SyncController::new(
            Arc::new(backend),
            Arc::new(Shared::new()),
            Duration::from_millis(50),
        )
    }

    fn queued_record(id: i64, owner: &str, name: &str) -> RepositoryRecord {
        RepositoryRecord {
            id,
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            sync_status: SyncStatus::Queued,
            sync_item_count: 0,
            sync_total_items: 0,
            last_synced_at: None,
            last_error: None,
        }
    }

    #[tokio::test]
    async fn test_malformed_identity_rejected_before_network() {
        // The mock panics on any call; reaching the backend fails the test
        let controller = controller_with(MockBackend::new());

        assert_matches!(
            controller.request_sync("bad-input-no-slash", "").await,
            Err(SyncRequestError::InvalidIdentity { .. })
        );
        assert_matches!(
            controller.request_sync("", "repo").await,
            Err(SyncRequestError::InvalidIdentity { .. })
        );
        assert_matches!(
            controller.request_sync("owner/extra", "repo").await,
            Err(SyncRequestError::InvalidIdentity { .. })
        );
        assert_matches!(
            controller.request_sync("owner", "re/po").await,
            Err(SyncRequestError::InvalidIdentity { .. })
        );
    }

    #[tokio::test]
    async fn test_request_sync_upserts_and_selects() {
        let mut backend = MockBackend::new();
        backend
            .expect_start_sync()
            .times(1)
            .returning(|o, n| Ok(queued_record(9, o, n)));

        let controller = controller_with(backend);
        let record = controller.request_sync("octo", "cat").await.unwrap();
        assert_eq!(record.id, 9);

        let registry = controller.shared.registry.lock().unwrap();
        assert_eq!(registry.records.len(), 1);
        assert_eq!(registry.selected_id, Some(9));
    }

    #[tokio::test]
    async fn test_request_sync_rejects_invalid_ack() {
        let mut backend = MockBackend::new();
        backend.expect_start_sync().returning(|o, n| {
            let mut record = queued_record(3, o, n);
            record.sync_item_count = 10;
            record.sync_total_items = 5;
            Ok(record)
        });

        let controller = controller_with(backend);
        assert_matches!(
            controller.request_sync("octo", "cat").await,
            Err(SyncRequestError::InvalidRecord(_))
        );

        // The bad record never entered the registry
        assert!(controller.shared.registry.lock().unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn test_request_flag_resets_after_backend_failure() {
        let mut backend = MockBackend::new();
        backend.expect_start_sync().times(2).returning(|_, _| {
            Err(BackendError::Status {
                status: 400,
                message: "could not resolve repository".into(),
            })
        });

        let controller = controller_with(backend);
        assert_matches!(
            controller.request_sync("octo", "cat").await,
            Err(SyncRequestError::Backend(_))
        );

        // A second attempt reaches the backend again instead of
        // reporting AlreadyInFlight
        assert_matches!(
            controller.request_sync("octo", "cat").await,
            Err(SyncRequestError::Backend(_))
        );
    }

    #[test]
    fn test_apply_snapshot_publishes_only_on_change() {
        let shared = Shared::new();
        let rx = shared.selected_tx.subscribe();

        let fresh = vec![queued_record(1, "o", "a")];
        apply_snapshot(&shared, fresh.clone(), false);
        assert!(rx.has_changed().unwrap());

        let mut rx = rx;
        assert_eq!(rx.borrow_and_update().as_ref().map(|r| r.id), Some(1));

        // Identical snapshot: no republication
        apply_snapshot(&shared, fresh, true);
        assert!(!rx.has_changed().unwrap());
    }
}
