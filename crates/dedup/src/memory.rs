use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Process-local fallback gate: a TTL-pruned map of event id → first-seen
/// instant. Entries are only ever inserted or expired, never updated.
///
/// Pruning is amortized into every call, so no background timer is needed.
pub struct MemoryTtlGate {
    entries: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl MemoryTtlGate {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Check-insert-prune in a single critical section.
    pub fn admit(&self, event_id: &str) -> bool {
        self.admit_at(event_id, Instant::now())
    }

    fn admit_at(&self, event_id: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, seen| now.duration_since(*seen) < self.ttl);
        if entries.contains_key(event_id) {
            return false;
        }
        entries.insert(event_id.to_string(), now);
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
