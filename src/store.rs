//! Repository store - the composition root consumers talk to
//!
//! The store holds the authoritative registry (records in backend list
//! order plus the selected-repository pointer) behind one mutex cell and
//! wires the sync controller, the backend client, and the selected-record
//! publication channel together. Consumers only read snapshots and invoke
//! the lifecycle operations here; records are never mutated from outside.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::debug;

use crate::backend::{AggregationBackend, AggregationClient};
use crate::config::Config;
use crate::controller::{apply_snapshot, SyncController};
use crate::error::{BackendError, PollError, SyncRequestError};
use crate::record::RepositoryRecord;

/// Registry contents: records in insertion (backend list) order plus the
/// selection pointer. A non-`None` `selected_id` always keys an existing
/// record.
pub(crate) struct Registry {
    pub records: Vec<RepositoryRecord>,
    pub selected_id: Option<i64>,
}

impl Registry {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            selected_id: None,
        }
    }

    pub fn selected_record(&self) -> Option<&RepositoryRecord> {
        self.selected_id
            .and_then(|id| self.records.iter().find(|r| r.id == id))
    }

    /// Whether any record still requires polling.
    pub fn needs_poll(&self) -> bool {
        self.records.iter().any(|r| r.sync_status.is_active())
    }

    /// Insert or update a record: matched by `id` when a record with that
    /// id exists, else by `full_name`, appended otherwise. Never a blind
    /// append, so an out-of-order acknowledgement cannot duplicate a row.
    pub fn upsert(&mut self, record: RepositoryRecord) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.full_name == record.full_name)
        {
            *existing = record;
        } else {
            self.records.push(record);
        }
    }

    /// Move the selection; returns false (leaving it untouched) when `id`
    /// does not key an existing record.
    pub fn select(&mut self, id: i64) -> bool {
        if self.records.iter().any(|r| r.id == id) {
            self.selected_id = Some(id);
            true
        } else {
            false
        }
    }

    /// Drop a record. If it was selected, the selection falls back to the
    /// first remaining record, or clears when the registry empties.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);

        if self.records.len() == before {
            return false;
        }

        if self.selected_id == Some(id) {
            self.selected_id = self.records.first().map(|r| r.id);
        }
        true
    }
}

/// State shared between the store, the controller, and the poll task.
pub(crate) struct Shared {
    pub registry: Mutex<Registry>,
    pub selected_tx: watch::Sender<Option<RepositoryRecord>>,
    /// A `request_sync` round trip is outstanding (duplicate-submit guard)
    pub sync_request_active: AtomicBool,
    /// A non-silent list fetch is outstanding
    pub loading: AtomicBool,
}

impl Shared {
    pub fn new() -> Self {
        let (selected_tx, _) = watch::channel(None);

        Self {
            registry: Mutex::new(Registry::new()),
            selected_tx,
            sync_request_active: AtomicBool::new(false),
            loading: AtomicBool::new(false),
        }
    }

    /// Republish the selected record. Guarded by deep equality, so
    /// subscribers only wake when the record actually changed.
    ///
    /// Callers must not hold the registry lock.
    pub fn publish_selected(&self) {
        let snapshot = self.registry.lock().unwrap().selected_record().cloned();

        self.selected_tx.send_if_modified(|current| {
            if *current != snapshot {
                *current = snapshot;
                true
            } else {
                false
            }
        });
    }
}

/// The lifecycle facade handed to consumers. One instance per backend;
/// inject it where needed - there is no ambient singleton.
pub struct RepositoryStore {
    shared: Arc<Shared>,
    backend: Arc<dyn AggregationBackend>,
    controller: SyncController,
}

impl RepositoryStore {
    /// Build a store against the configured aggregation service.
    pub fn new(config: &Config) -> Result<Self> {
        let poll_interval = config
            .poll
            .interval_duration()
            .context("Failed to parse poll interval")?;

        Ok(Self::with_backend(
            Arc::new(AggregationClient::new(&config.backend.base_url)),
            poll_interval,
        ))
    }

    /// Build a store over any backend implementation. This is the
    /// dependency-injection seam tests and embedders use.
    pub fn with_backend(backend: Arc<dyn AggregationBackend>, poll_interval: Duration) -> Self {
        let shared = Arc::new(Shared::new());
        let controller =
            SyncController::new(Arc::clone(&backend), Arc::clone(&shared), poll_interval);

        Self {
            shared,
            backend,
            controller,
        }
    }

    /// Snapshot of every tracked repository, in backend list order.
    pub fn list_repositories(&self) -> Vec<RepositoryRecord> {
        self.shared.registry.lock().unwrap().records.clone()
    }

    /// Snapshot of the currently selected repository, if any.
    pub fn selected_repository(&self) -> Option<RepositoryRecord> {
        self.shared
            .registry
            .lock()
            .unwrap()
            .selected_record()
            .cloned()
    }

    /// Move the selection to a known record. A no-op when `id` does not
    /// key an existing record; selection never points at arbitrary values.
    pub fn select_repository(&self, id: i64) {
        let selected = self.shared.registry.lock().unwrap().select(id);

        if selected {
            self.shared.publish_selected();
        } else {
            debug!("Ignoring selection of unknown repository {}", id);
        }
    }

    /// Start (or restart) a sync for `owner/name`. See
    /// [`SyncController::request_sync`].
    pub async fn request_sync(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryRecord, SyncRequestError> {
        self.controller.request_sync(owner, name).await
    }

    /// True while a `request_sync` round trip to the backend is
    /// outstanding - not while the background sync itself runs. Used to
    /// disable duplicate submit actions.
    pub fn is_syncing(&self) -> bool {
        self.shared.sync_request_active.load(Ordering::SeqCst)
    }

    /// True while a non-silent [`refresh`](Self::refresh) is outstanding.
    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::SeqCst)
    }

    /// Fetch the current repository snapshot and reconcile it in.
    ///
    /// `silent` selects the background-poll behavior: no loading flag and
    /// no first-population selection. Non-silent refreshes drive
    /// [`is_loading`](Self::is_loading) and may select the first record
    /// when nothing is selected yet. Either way, polling is armed when the
    /// snapshot contains active records.
    pub async fn refresh(&self, silent: bool) -> Result<(), PollError> {
        if !silent {
            self.shared.loading.store(true, Ordering::SeqCst);
        }

        let result = self.backend.list_repositories().await;

        if !silent {
            self.shared.loading.store(false, Ordering::SeqCst);
        }

        let fresh = result.map_err(PollError::from)?;
        apply_snapshot(&self.shared, fresh, silent);
        self.controller.ensure_polling();
        Ok(())
    }

    /// Stop tracking a repository: backend delete, then local removal.
    /// If the removed record was selected, the selection falls back to the
    /// first remaining record or clears.
    pub async fn remove_repository(&self, id: i64) -> Result<(), BackendError> {
        self.backend.remove_repository(id).await?;

        let removed = self.shared.registry.lock().unwrap().remove(id);
        if removed {
            self.shared.publish_selected();
            debug!("Removed repository {}", id);
        }
        Ok(())
    }

    /// Subscribe to selected-record changes. The channel republishes only
    /// when the record actually differs (deep equality), so a 2-second
    /// poll cadence does not translate into a re-render storm.
    pub fn subscribe_selected(&self) -> watch::Receiver<Option<RepositoryRecord>> {
        self.shared.selected_tx.subscribe()
    }

    /// Cooperative teardown: stops the poll timer. No further network
    /// calls are issued; backend-side syncs continue independently.
    pub fn shutdown(&self) {
        self.controller.shutdown();
    }
}
