//! Selection reconciliation - merging fresh backend snapshots into the registry
//!
//! The backend is the single source of truth for the repository set and its
//! sync counters, so a fresh snapshot replaces the registry wholesale rather
//! than merging individual fields (field-level merging is where stale-field
//! bugs come from). The only stateful decision is what happens to the user's
//! selection, and whether the selected record actually changed - the signal
//! consumers use to re-render progress without repainting on every poll.

use crate::record::RepositoryRecord;

/// Result of reconciling one fresh snapshot against the current registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// The new registry contents, in backend list order
    pub records: Vec<RepositoryRecord>,
    pub selected_id: Option<i64>,
    /// The selected record, present only when it materially changed:
    /// either its fields differ from the previous copy, or a selection was
    /// just assigned. `None` means nothing the consumer cares about moved.
    pub selected_changed: Option<RepositoryRecord>,
}

/// Reconcile a fresh repository list against the current registry state.
///
/// Rules:
/// 1. The fresh list replaces the registry verbatim.
/// 2. A selection that is still present is kept; a deep-equality check
///    decides whether to raise the changed signal.
/// 3. With no selection, a non-empty list, and a non-`silent` fetch, the
///    first record is selected (first population). Silent background polls
///    never assign a selection.
/// 4. A selection pointing at a record missing from the fresh list falls
///    back to `None`.
pub fn reconcile(
    fresh: Vec<RepositoryRecord>,
    current_records: &[RepositoryRecord],
    current_selected: Option<i64>,
    silent: bool,
) -> ReconcileOutcome {
    let (selected_id, selected_changed) = match current_selected {
        Some(selected) => match fresh.iter().find(|r| r.id == selected) {
            Some(new_record) => {
                let old_record = current_records.iter().find(|r| r.id == selected);
                let changed = old_record != Some(new_record);
                (
                    Some(selected),
                    changed.then(|| new_record.clone()),
                )
            }
            // Removed out-of-band; nothing sensible to select on its behalf
            None => (None, None),
        },
        None if !silent && !fresh.is_empty() => {
            let first = fresh[0].clone();
            (Some(first.id), Some(first))
        }
        None => (None, None),
    };

    ReconcileOutcome {
        records: fresh,
        selected_id,
        selected_changed,
    }
}
