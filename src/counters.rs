use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

/// Live byte counters for one tracked request, shared between the request's
/// own handling code and the registry's `Live` entry via a single `Arc`.
///
/// Fields are independent atomics rather than a single mutex-guarded struct:
/// readers (the collector) and the one writer (the request's own task) never
/// need a consistent cross-field snapshot stronger than "recent", per the
/// distilled spec's non-goal on byte-accurate live counters.
#[derive(Debug, Default)]
pub struct RequestCounters {
    request_size: AtomicU64,
    response_size: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    status_code: AtomicU16,
}

impl RequestCounters {
    pub fn new(request_size: u64) -> Self {
        RequestCounters {
            request_size: AtomicU64::new(request_size),
            response_size: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            status_code: AtomicU16::new(0),
        }
    }

    pub fn add_bytes_in(&self, n: u64) {
        self.bytes_in.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_bytes_out(&self, n: u64) {
        self.bytes_out.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_response_size(&self, n: u64) {
        self.response_size.store(n, Ordering::Relaxed);
    }

    pub fn set_status_code(&self, status: u16) {
        self.status_code.store(status, Ordering::Relaxed);
    }

    /// Reads all counters as a consistent-enough point-in-time snapshot.
    /// Each field load is independently atomic; the four fields together are
    /// not guaranteed simultaneous, matching §5's "recent, not instantaneous"
    /// snapshot guarantee.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            request_size: self.request_size.load(Ordering::Relaxed),
            response_size: self.response_size.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            status_code: self.status_code.load(Ordering::Relaxed),
        }
    }
}

/// A frozen set of counters, either captured at Live→Tombstone transition or
/// read on demand from a still-Live request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub request_size: u64,
    pub response_size: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub status_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_updates() {
        let counters = RequestCounters::new(1000);
        counters.add_bytes_in(400);
        let snap = counters.snapshot();
        assert_eq!(snap.request_size, 1000);
        assert_eq!(snap.bytes_in, 400);
        assert_eq!(snap.bytes_out, 0);
        assert_eq!(snap.status_code, 0);
    }

    #[test]
    fn status_and_response_size_settable() {
        let counters = RequestCounters::new(1000);
        counters.set_response_size(50);
        counters.set_status_code(200);
        let snap = counters.snapshot();
        assert_eq!(snap.response_size, 50);
        assert_eq!(snap.status_code, 200);
    }
}
