//! Progress estimation - percent complete and remaining-time labels
//!
//! A snapshot estimator, not a smoothed one: every call recomputes from the
//! current counters and elapsed wall-clock time, so the ETA can be noisy
//! between polls but never accumulates error across renders.

use chrono::{DateTime, Utc};

use crate::record::RepositoryRecord;

/// Below this much elapsed time the throughput sample is mostly noise, so
/// the estimator reports `Calculating…` instead of a wild ETA.
pub const CALCULATING_FLOOR_SECS: f64 = 2.0;

/// Human-scaled remaining-time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingTime {
    /// Not enough signal yet (no items done, or under the elapsed floor)
    Calculating,
    Seconds(u64),
    Minutes(u64),
}

impl std::fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemainingTime::Calculating => write!(f, "Calculating…"),
            RemainingTime::Seconds(secs) => write!(f, "{}s remaining", secs),
            RemainingTime::Minutes(mins) => write!(f, "{}m remaining", mins),
        }
    }
}

/// Point-in-time progress of an in-flight sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncProgress {
    /// Percent complete, 0-100
    pub percent: u8,
    pub remaining: RemainingTime,
}

impl SyncProgress {
    /// Estimate progress for a record, using its `last_synced_at` as the
    /// elapsed-time epoch. A record without an epoch reports `Calculating…`.
    pub fn for_record(record: &RepositoryRecord, now: DateTime<Utc>) -> Self {
        let elapsed_seconds = record
            .last_synced_at
            .map(|started| (now - started).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        estimate(
            record.sync_item_count,
            record.sync_total_items,
            elapsed_seconds,
        )
    }

    pub fn remaining_label(&self) -> String {
        self.remaining.to_string()
    }
}

/// Turn cumulative counters and elapsed time into percent and ETA.
///
/// The rate is an instantaneous sample (`items done / elapsed`); the first
/// two seconds and the zero-items case report `Calculating…` to avoid
/// divide-by-near-zero noise.
pub fn estimate(item_count: u64, total_items: u64, elapsed_seconds: f64) -> SyncProgress {
    let percent = if total_items > 0 {
        ((item_count as f64 / total_items as f64) * 100.0)
            .round()
            .clamp(0.0, 100.0) as u8
    } else {
        0
    };

    let remaining = if item_count == 0 || elapsed_seconds < CALCULATING_FLOOR_SECS {
        RemainingTime::Calculating
    } else {
        let rate = item_count as f64 / elapsed_seconds;
        let remaining_seconds = total_items.saturating_sub(item_count) as f64 / rate;

        if remaining_seconds < 60.0 {
            RemainingTime::Seconds(remaining_seconds.ceil() as u64)
        } else {
            RemainingTime::Minutes((remaining_seconds / 60.0).ceil() as u64)
        }
    };

    SyncProgress { percent, remaining }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quickcheck_macros::quickcheck;

    use crate::record::SyncStatus;

    #[test]
    fn test_percent_basic() {
        assert_eq!(estimate(0, 100, 0.0).percent, 0);
        assert_eq!(estimate(50, 100, 10.0).percent, 50);
        assert_eq!(estimate(100, 100, 10.0).percent, 100);
        // Rounded, not truncated
        assert_eq!(estimate(1, 3, 10.0).percent, 33);
        assert_eq!(estimate(2, 3, 10.0).percent, 67);
    }

    #[test]
    fn test_percent_zero_when_total_unknown() {
        assert_eq!(estimate(5, 0, 10.0).percent, 0);
    }

    #[test]
    fn test_calculating_when_no_items_done() {
        let progress = estimate(0, 100, 5.0);
        assert_eq!(progress.remaining, RemainingTime::Calculating);
        assert_eq!(progress.remaining_label(), "Calculating…");
    }

    #[test]
    fn test_calculating_below_elapsed_floor() {
        assert_eq!(estimate(50, 100, 1.0).remaining, RemainingTime::Calculating);
        // At the floor the sample is trusted
        assert_ne!(estimate(50, 100, 2.0).remaining, RemainingTime::Calculating);
    }

    #[test]
    fn test_seconds_label_under_a_minute() {
        // rate = 5 items/s, 50 items left -> 10s
        let progress = estimate(50, 100, 10.0);
        assert_eq!(progress.remaining, RemainingTime::Seconds(10));
        assert_eq!(progress.remaining_label(), "10s remaining");

        // ceil on fractional seconds: rate = 3/7 items/s, 7 left -> 16.33s
        assert_eq!(estimate(3, 10, 7.0).remaining, RemainingTime::Seconds(17));
    }

    #[test]
    fn test_ninety_seconds_rounds_up_to_minutes() {
        // rate = 1 item/s, 90 items left: over the minute boundary
        let progress = estimate(10, 100, 10.0);
        assert_eq!(progress.remaining, RemainingTime::Minutes(2));
        assert_eq!(progress.remaining_label(), "2m remaining");
    }

    #[test]
    fn test_minutes_label_for_slow_sync() {
        // rate = 0.01 item/s, 90 items left -> 9000s -> 150m
        let progress = estimate(10, 100, 1000.0);
        assert_eq!(progress.remaining, RemainingTime::Minutes(150));
        assert!(progress.remaining_label().ends_with("m remaining"));
    }

    #[test]
    fn test_for_record_uses_last_synced_at_epoch() {
        let now = Utc::now();
        let record = RepositoryRecord {
            id: 1,
            owner: "o".into(),
            name: "r".into(),
            full_name: "o/r".into(),
            sync_status: SyncStatus::Syncing,
            sync_item_count: 10,
            sync_total_items: 100,
            last_synced_at: Some(now - Duration::seconds(10)),
            last_error: None,
        };

        let progress = SyncProgress::for_record(&record, now);
        assert_eq!(progress.percent, 10);
        assert_eq!(progress.remaining, RemainingTime::Seconds(90));
    }

    #[test]
    fn test_for_record_without_epoch_is_calculating() {
        let record = RepositoryRecord {
            id: 1,
            owner: "o".into(),
            name: "r".into(),
            full_name: "o/r".into(),
            sync_status: SyncStatus::Queued,
            sync_item_count: 10,
            sync_total_items: 100,
            last_synced_at: None,
            last_error: None,
        };

        let progress = SyncProgress::for_record(&record, Utc::now());
        assert_eq!(progress.remaining, RemainingTime::Calculating);
    }

    #[quickcheck]
    fn prop_percent_bounded(item_count: u64, total_items: u64) -> bool {
        let count = item_count.min(total_items);
        estimate(count, total_items, 10.0).percent <= 100
    }

    #[quickcheck]
    fn prop_percent_monotonic_in_item_count(total: u16, a: u16, b: u16) -> bool {
        if total == 0 {
            return true;
        }
        let total = total as u64;
        let lo = (a as u64).min(b as u64).min(total);
        let hi = (a as u64).max(b as u64).min(total);

        estimate(lo, total, 10.0).percent <= estimate(hi, total, 10.0).percent
    }
}
