//! Idempotency gate for at-least-once webhook delivery.
//!
//! Each inbound event id is admitted exactly once. The primary path is a
//! unique-constrained insert through [`DedupStore`]; when the store is
//! unconfigured or failing, admission degrades to a process-local TTL map.
//! The fallback is deliberately weaker: it gives no guarantee across multiple
//! instances, and an event admitted on one instance is invisible to another.
//! That gap is accepted — availability wins over blocking inbound processing.

mod memory;
mod store;

use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

pub use crate::{
    memory::MemoryTtlGate,
    store::{DedupStore, SqliteDedupStore},
};

/// Default window during which a redelivered event id is recognized
/// by the in-memory fallback.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Admits each event id exactly once (per store, or per process when
/// degraded to the fallback).
pub struct EventDeduplicator {
    store: Option<Arc<dyn DedupStore>>,
    fallback: MemoryTtlGate,
}

impl EventDeduplicator {
    #[must_use]
    pub fn new(store: Option<Arc<dyn DedupStore>>, ttl: Duration) -> Self {
        Self {
            store,
            fallback: MemoryTtlGate::new(ttl),
        }
    }

    /// Returns `true` when the event should be processed, `false` when it is
    /// a duplicate and must be dropped.
    ///
    /// Store errors other than a uniqueness violation degrade to the local
    /// fallback rather than failing the call.
    pub async fn admit_once(&self, event_id: &str) -> bool {
        if let Some(ref store) = self.store {
            match store.insert_once(event_id, unix_now()).await {
                Ok(admitted) => {
                    debug!(event_id, admitted, "dedup store decision");
                    return admitted;
                },
                Err(e) => {
                    warn!(event_id, error = %e, "dedup store unavailable, using in-memory fallback");
                },
            }
        }
        let admitted = self.fallback.admit(event_id);
        debug!(event_id, admitted, "dedup fallback decision");
        admitted
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
