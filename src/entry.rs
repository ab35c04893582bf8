use crate::counters::{ProgressSnapshot, RequestCounters};
use std::sync::Arc;
use tokio::time::Instant;

/// A single tracked request's state as held by its owning shard.
///
/// Either variant, never both, never neither — enforced by the type itself
/// rather than by a pair of nullable fields and a manual invariant check.
#[derive(Clone)]
pub enum TrackingEntry {
    /// The tracked request is still in flight. Counters are read through the
    /// shared handle on demand; nothing is duplicated here.
    Live { counters: Arc<RequestCounters> },
    /// The tracked request finished; this is a frozen copy of its final
    /// counters, retained until `expires_at`.
    Tombstone {
        snapshot: ProgressSnapshot,
        expires_at: Instant,
    },
}

impl TrackingEntry {
    pub fn live(counters: Arc<RequestCounters>) -> Self {
        TrackingEntry::Live { counters }
    }

    pub fn tombstone(snapshot: ProgressSnapshot, expires_at: Instant) -> Self {
        TrackingEntry::Tombstone {
            snapshot,
            expires_at,
        }
    }

    /// Produces an owned, self-contained snapshot suitable for crossing a
    /// task boundary (the cross-worker collector never hands out a
    /// reference into shard state).
    pub fn current_snapshot(&self) -> ProgressSnapshot {
        match self {
            TrackingEntry::Live { counters } => counters.snapshot(),
            TrackingEntry::Tombstone { snapshot, .. } => *snapshot,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, TrackingEntry::Tombstone { .. })
    }
}
