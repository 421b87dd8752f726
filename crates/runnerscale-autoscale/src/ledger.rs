//! In-memory scale history, keyed by fleet.
//!
//! The caller owns persistence: seed the ledger with `from_records` and
//! write `records()` back out after a pass.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use runnerscale_core::{FleetKey, ScaleHistory};

/// Per-fleet scale history shared across passes.
#[derive(Clone, Default)]
pub struct HistoryLedger {
    records: Arc<RwLock<HashMap<FleetKey, ScaleHistory>>>,
}

impl HistoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger with previously persisted records.
    pub fn from_records(records: impl IntoIterator<Item = (FleetKey, ScaleHistory)>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records.into_iter().collect())),
        }
    }

    /// History recorded for `fleet`, if any.
    pub async fn load(&self, fleet: &str) -> Option<ScaleHistory> {
        self.records.read().await.get(fleet).copied()
    }

    /// Replace the history recorded for `fleet`.
    pub async fn store(&self, fleet: &str, history: ScaleHistory) {
        let mut records = self.records.write().await;
        records.insert(fleet.to_string(), history);
        debug!(
            %fleet,
            committed = history.committed_replicas,
            "stored scale history"
        );
    }

    /// Forget a fleet, e.g. after it was deleted.
    pub async fn remove(&self, fleet: &str) -> Option<ScaleHistory> {
        self.records.write().await.remove(fleet)
    }

    /// Snapshot of every record.
    pub async fn records(&self) -> HashMap<FleetKey, ScaleHistory> {
        self.records.read().await.clone()
    }
}
