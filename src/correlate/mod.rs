//! Request/response correlation for indexed (`M2`) traffic.
//!
//! Forwarding is stateless per frame; this tracker exists for diagnostics:
//! round-trip latency and detection of silently-dropped responses. Losing an
//! entry never blocks delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::shared_types::Endpoint;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// -----------------------------------------------------------------------------
// ----- PendingRequest --------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub idex: u64,
    pub endpoint: Endpoint,
    pub sent_at: Instant,
}

// -----------------------------------------------------------------------------
// ----- CorrelationTracker ----------------------------------------------------

#[derive(Debug)]
pub struct CorrelationTracker {
    pending: Mutex<HashMap<u64, PendingRequest>>,
    next_idex: AtomicU64,
    timeout: Duration,
}

// -----------------------------------------------------------------------------
// ----- CorrelationTracker: Static --------------------------------------------

impl CorrelationTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_idex: AtomicU64::new(1),
            timeout,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- CorrelationTracker: Public --------------------------------------------

impl CorrelationTracker {
    /// Allocate a fresh `idex` and record the in-flight request. The id is
    /// unique for the life of the process, so a stale response can never
    /// resolve a newer request.
    pub fn register(&self, endpoint: Endpoint) -> u64 {
        let idex = self.next_idex.fetch_add(1, Ordering::Relaxed);

        self.pending.lock().insert(
            idex,
            PendingRequest {
                idex,
                endpoint,
                sent_at: Instant::now(),
            },
        );

        idex
    }

    /// Remove and return the matching in-flight request, if it is still
    /// outstanding. Absence means the entry already expired or was never
    /// ours; the response is forwarded regardless.
    pub fn resolve(&self, idex: u64) -> Option<PendingRequest> {
        self.pending.lock().remove(&idex)
    }

    /// Drop entries older than the configured timeout and hand them back so
    /// the caller can log the lost responses.
    pub fn expire(&self, now: Instant) -> Vec<PendingRequest> {
        let mut guard = self.pending.lock();

        let expired: Vec<u64> = guard
            .values()
            .filter(|p| now.duration_since(p.sent_at) >= self.timeout)
            .map(|p| p.idex)
            .collect();

        expired
            .into_iter()
            .filter_map(|idex| guard.remove(&idex))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_allocates_unique_ids() {
        let tracker = CorrelationTracker::new(DEFAULT_TIMEOUT);

        let a = tracker.register(Endpoint::FrontEnd);
        let b = tracker.register(Endpoint::FrontEnd);

        assert_ne!(a, b);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn resolve_removes_the_entry() {
        let tracker = CorrelationTracker::new(DEFAULT_TIMEOUT);
        let idex = tracker.register(Endpoint::FrontEnd);

        let pending = tracker.resolve(idex).expect("registered");
        assert_eq!(pending.idex, idex);
        assert_eq!(pending.endpoint, Endpoint::FrontEnd);

        assert!(tracker.resolve(idex).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn expire_removes_only_stale_entries() {
        let tracker = CorrelationTracker::new(Duration::from_millis(10));

        let stale = tracker.register(Endpoint::FrontEnd);
        let expired = tracker.expire(Instant::now() + Duration::from_millis(50));

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].idex, stale);
        assert!(tracker.is_empty());
    }

    #[test]
    fn expire_keeps_fresh_entries() {
        let tracker = CorrelationTracker::new(Duration::from_secs(60));
        tracker.register(Endpoint::FrontEnd);

        assert!(tracker.expire(Instant::now()).is_empty());
        assert_eq!(tracker.len(), 1);
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
