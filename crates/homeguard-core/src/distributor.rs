// ── Snapshot fan-out ──
//
// Concurrent observer registry keyed by observer identity. Each refresh
// hands the fresh snapshot to every registered observer; one observer
// failing (or panicking) never stops delivery to the rest.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use homeguard_api::InstallationOverview;

use crate::error::CoreError;

/// Something that consumes installation snapshots.
pub trait SnapshotObserver: Send + Sync {
    /// Stable identity. Two observers with the same key are the same
    /// registration.
    fn key(&self) -> &str;

    /// Extract and republish this observer's slice of `snapshot`.
    fn on_snapshot(&self, snapshot: &InstallationOverview) -> Result<(), CoreError>;
}

/// Outcome of one distribution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionReport {
    pub delivered: usize,
    /// Keys of observers that returned an error or panicked.
    pub failed: Vec<String>,
}

/// Registry of snapshot observers.
#[derive(Default)]
pub struct SnapshotDistributor {
    observers: DashMap<String, Arc<dyn SnapshotObserver>>,
}

impl SnapshotDistributor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `observer`. Returns `false` (and changes nothing) if an observer
    /// with the same key is already registered.
    pub fn register(&self, observer: Arc<dyn SnapshotObserver>) -> bool {
        match self.observers.entry(observer.key().to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(observer);
                true
            }
        }
    }

    /// Remove the observer registered under `key`. Returns `false` if there
    /// was none.
    pub fn unregister(&self, key: &str) -> bool {
        self.observers.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.observers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver `snapshot` to every registered observer. Order is unspecified.
    pub fn distribute(&self, snapshot: &InstallationOverview) -> DistributionReport {
        // Collect first so no shard lock is held while observers run;
        // an observer may (un)register others from its callback.
        let observers: Vec<Arc<dyn SnapshotObserver>> = self
            .observers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        debug!(observers = observers.len(), "distributing snapshot");

        let mut report = DistributionReport::default();
        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_snapshot(snapshot))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(observer = observer.key(), error = %e, "observer failed");
                    report.failed.push(observer.key().to_owned());
                }
                Err(_) => {
                    warn!(observer = observer.key(), "observer panicked");
                    report.failed.push(observer.key().to_owned());
                }
            }
        }
        report
    }
}
