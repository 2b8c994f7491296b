//! Process-lifetime cache of the latest check outcome per container.
//!
//! Every access takes the lock for the duration of a single map operation
//! only; callers never hold it across runtime calls.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::types::CheckOutcome;

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    outcome: CheckOutcome,
}

/// Latest [`CheckOutcome`] keyed by container ID.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome, replacing any earlier one for the same container.
    pub async fn insert(&self, id: &str, name: &str, outcome: CheckOutcome) {
        let entry = Entry {
            name: name.to_string(),
            outcome,
        };
        self.entries.write().await.insert(id.to_string(), entry);
    }

    pub async fn get(&self, id: &str) -> Option<CheckOutcome> {
        self.entries
            .read()
            .await
            .get(id)
            .map(|entry| entry.outcome.clone())
    }

    /// Drop the outcome of a container after an update was dispatched.
    pub async fn evict(&self, id: &str) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    /// Drop every outcome recorded under a container name. Returns how
    /// many entries were removed.
    pub async fn evict_name(&self, name: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.name != name);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
