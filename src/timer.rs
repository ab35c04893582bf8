use crate::progress_id::ProgressId;
use std::collections::VecDeque;
use tokio::time::Instant;

struct QueuedTombstone {
    id: ProgressId,
    expires_at: Instant,
}

/// A FIFO of tombstoned entries ordered by expiry.
///
/// Because every tombstone shares the same process-wide TTL (§4.1), push
/// order is expiry order: the queue needs no heap, just a `VecDeque`, and
/// the shard actor only ever has to watch the head.
#[derive(Default)]
pub struct WaitQueue {
    queue: VecDeque<QueuedTombstone>,
}

impl WaitQueue {
    pub fn new() -> Self {
        WaitQueue {
            queue: VecDeque::new(),
        }
    }

    /// Appends a newly tombstoned id with the given expiry. Callers are
    /// responsible for computing `expires_at = now + ttl`, since the queue
    /// itself has no notion of "now".
    pub fn push(&mut self, id: ProgressId, expires_at: Instant) {
        self.queue.push_back(QueuedTombstone { id, expires_at });
    }

    /// Drains and returns every id whose expiry has passed, front to back,
    /// stopping at the first entry that hasn't expired yet (push order is
    /// expiry order, so there's nothing further back worth checking).
    pub fn pop_expired(&mut self, now: Instant) -> Vec<ProgressId> {
        let mut expired = Vec::new();
        while let Some(front) = self.queue.front() {
            if front.expires_at > now {
                break;
            }
            expired.push(self.queue.pop_front().unwrap().id);
        }
        expired
    }

    /// O(n) unlink of an arbitrary id — used when a Live entry for `id` is
    /// replaced or removed before ever being tombstoned. Not on any hot
    /// path; supported for correctness, not throughput.
    pub fn remove(&mut self, id: &ProgressId) {
        self.queue.retain(|entry| &entry.id != id);
    }

    /// The expiry the shard actor should next wake for, if anything is
    /// queued.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.queue.front().map(|entry| entry.expires_at)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
