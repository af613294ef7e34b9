//! Per-check invocation counters.
//!
//! Counts completed invocations by check name. Increments are serialized
//! through a mutex'd map, so each name's count is linearizable; counts never
//! decrease.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::Mutex;
use tracing::trace;

/// Mapping from check name to a monotonically increasing invocation count.
#[derive(Debug, Default)]
pub struct InvocationCounters {
    counts: Mutex<HashMap<String, u64>>,
}

impl InvocationCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one completed invocation. Returns the new count.
    pub async fn increment(&self, name: &str) -> u64 {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        trace!(check = %name, count = *count, "invocation counted");
        *count
    }

    /// Current count for one check name (0 when never invoked).
    pub async fn get(&self, name: &str) -> u64 {
        let counts = self.counts.lock().await;
        counts.get(name).copied().unwrap_or(0)
    }

    /// Sorted snapshot of all counters.
    pub async fn snapshot(&self) -> BTreeMap<String, u64> {
        let counts = self.counts.lock().await;
        counts.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}
