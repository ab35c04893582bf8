use crate::counters::RequestCounters;
use crate::progress_id::ProgressId;
use crate::shard::ShardHandle;
use std::sync::Arc;

/// The non-owning back-reference a tracked request carries to its own
/// registry entry — the Request→Entry side of §3's bidirectional link.
///
/// In the reference C implementation this is a raw pointer, nulled on
/// either side whenever the link breaks. Idiomatic Rust has no reason to
/// reach for a nullable pointer here: the handle's validity is just
/// ordinary ownership, and `complete` is the one message that drives the
/// Live→Tombstone transition (§4.3), sent exactly once from the request's
/// completion hook.
pub struct TrackHandle {
    id: ProgressId,
    shard: ShardHandle,
    counters: Arc<RequestCounters>,
}

impl TrackHandle {
    pub fn new(id: ProgressId, shard: ShardHandle, counters: Arc<RequestCounters>) -> Self {
        TrackHandle {
            id,
            shard,
            counters,
        }
    }

    pub fn counters(&self) -> &Arc<RequestCounters> {
        &self.counters
    }

    /// Drives the Live→Tombstone transition. Must be called exactly once,
    /// from the request's completion hook — calling it more than once is
    /// harmless (the shard's `complete` is a no-op on an already-tombstoned
    /// or missing entry) but should never be needed.
    pub async fn complete(&self) {
        self.shard.complete(self.id.clone()).await;
    }
}
