use crate::counters::{ProgressSnapshot, RequestCounters};
use crate::entry::TrackingEntry;
use crate::progress_id::ProgressId;
use crate::timer::WaitQueue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Messages a shard actor accepts. Every cross-shard interaction — including
/// the collector's reads from a different worker — goes through this
/// channel, so the shard's own state is only ever touched from inside its
/// one task.
enum ShardCommand {
    /// Registers a new Live entry, evicting whatever was previously stored
    /// for `id` in this shard (§4.2 insert semantics).
    Track {
        id: ProgressId,
        counters: Arc<RequestCounters>,
    },
    /// Transitions a Live entry to a Tombstone, snapshotting its counters
    /// and pushing it onto the wait-queue. A no-op if the entry isn't
    /// present or already tombstoned (the completion hook fires once, but
    /// defensively tolerates being called on an unknown id).
    Complete { id: ProgressId },
    /// The cross-worker collector's read: look up `id` and reply with an
    /// owned snapshot, or `None`.
    CollectSnapshot {
        id: ProgressId,
        reply: oneshot::Sender<Option<ProgressSnapshot>>,
    },
}

/// A cloneable handle to one shard's command channel. Cheap to clone and
/// send across tasks; the shard itself never leaves its own task.
#[derive(Clone)]
pub struct ShardHandle {
    tx: mpsc::Sender<ShardCommand>,
}

impl ShardHandle {
    /// Registers a Live entry for `id`, sharing `counters` with the shard.
    /// Fire-and-forget: the track action never blocks on the shard's
    /// internal bookkeeping (§4.4 — track always falls through).
    pub async fn track(&self, id: ProgressId, counters: Arc<RequestCounters>) {
        let _ = self.tx.send(ShardCommand::Track { id, counters }).await;
    }

    /// Signals that the tracked request identified by `id` has finished.
    pub async fn complete(&self, id: ProgressId) {
        let _ = self.tx.send(ShardCommand::Complete { id }).await;
    }

    /// Reads `id` from this shard, if present, without ever locking the
    /// shard's state from outside its own task.
    pub async fn collect(&self, id: ProgressId) -> Option<ProgressSnapshot> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(ShardCommand::CollectSnapshot { id, reply })
            .await
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }
}

/// Owns one worker's tracking map and tombstone wait-queue, and runs as a
/// dedicated Tokio task — the actor pattern the reference codebase uses to
/// give each protocol session exclusive ownership of its state instead of a
/// shared mutex.
struct ShardActor {
    entries: HashMap<ProgressId, TrackingEntry>,
    queue: WaitQueue,
    ttl: Duration,
    rx: mpsc::Receiver<ShardCommand>,
    worker_index: usize,
}

/// Spawns a shard actor task and returns the handle other tasks use to talk
/// to it. The actor runs until its handle (and every clone of it) is
/// dropped, at which point its entries drop with it — the Live→(none)
/// cascade from §4.3.
pub fn spawn_shard(worker_index: usize, ttl: Duration) -> ShardHandle {
    let (tx, rx) = mpsc::channel(256);
    let actor = ShardActor {
        entries: HashMap::new(),
        queue: WaitQueue::new(),
        ttl,
        rx,
        worker_index,
    };
    tokio::spawn(actor.run());
    ShardHandle { tx }
}

impl ShardActor {
    async fn run(mut self) {
        loop {
            let sleep = match self.queue.next_expiry() {
                Some(expiry) => tokio::time::sleep_until(expiry),
                None => tokio::time::sleep_until(Instant::now() + Duration::from_secs(3600)),
            };
            tokio::pin!(sleep);

            tokio::select! {
                command = self.rx.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => {
                            tracing::debug!(worker = self.worker_index, "shard shutting down");
                            break;
                        }
                    }
                }
                _ = &mut sleep, if self.queue.next_expiry().is_some() => {
                    self.reap();
                }
            }
        }
    }

    fn handle(&mut self, command: ShardCommand) {
        match command {
            ShardCommand::Track { id, counters } => self.track(id, counters),
            ShardCommand::Complete { id } => self.complete(id),
            ShardCommand::CollectSnapshot { id, reply } => {
                let snapshot = self.entries.get(&id).map(TrackingEntry::current_snapshot);
                let _ = reply.send(snapshot);
            }
        }
    }

    fn track(&mut self, id: ProgressId, counters: Arc<RequestCounters>) {
        self.evict(&id);
        self.entries.insert(id, TrackingEntry::live(counters));
    }

    fn complete(&mut self, id: ProgressId) {
        let Some(entry) = self.entries.get(&id) else {
            return;
        };
        if entry.is_tombstone() {
            return;
        }
        let snapshot = entry.current_snapshot();
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .insert(id.clone(), TrackingEntry::tombstone(snapshot, expires_at));
        self.queue.push(id, expires_at);
    }

    /// Drops whatever entry currently occupies `id` in this shard, per the
    /// insert-replace semantics of §4.2: a Tombstone is unlinked from the
    /// wait-queue, a Live entry simply drops its `Arc` handle.
    fn evict(&mut self, id: &ProgressId) {
        if let Some(entry) = self.entries.remove(id) {
            if entry.is_tombstone() {
                self.queue.remove(id);
            }
        }
    }

    fn reap(&mut self) {
        let expired = self.queue.pop_expired(Instant::now());
        if expired.is_empty() {
            return;
        }
        tracing::debug!(worker = self.worker_index, count = expired.len(), "reaping tombstones");
        crate::metrics_server::record_reaped(self.worker_index, expired.len());
        for id in expired {
            self.entries.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress_id::ProgressId;

    fn id(s: &str) -> ProgressId {
        ProgressId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn track_then_collect_sees_live_counters() {
        let shard = spawn_shard(0, Duration::from_secs(30));
        let counters = Arc::new(RequestCounters::new(1000));
        counters.add_bytes_in(400);

        shard.track(id("abc"), counters.clone()).await;

        let snap = shard.collect(id("abc")).await.expect("entry present");
        assert_eq!(snap.request_size, 1000);
        assert_eq!(snap.bytes_in, 400);
        assert_eq!(snap.status_code, 0);
    }

    #[tokio::test]
    async fn complete_freezes_snapshot_and_status() {
        let shard = spawn_shard(0, Duration::from_secs(30));
        let counters = Arc::new(RequestCounters::new(1000));
        counters.add_bytes_in(1000);
        counters.set_response_size(50);
        counters.set_status_code(200);

        shard.track(id("abc"), counters.clone()).await;
        shard.complete(id("abc")).await;

        // Mutating the source counters after completion must not affect the
        // frozen tombstone snapshot.
        counters.add_bytes_in(999);

        let snap = shard.collect(id("abc")).await.expect("tombstone present");
        assert_eq!(snap.bytes_in, 1000);
        assert_eq!(snap.status_code, 200);
    }

    #[tokio::test]
    async fn unknown_id_collects_to_none() {
        let shard = spawn_shard(0, Duration::from_secs(30));
        assert!(shard.collect(id("nope")).await.is_none());
    }

    #[tokio::test]
    async fn retrack_evicts_prior_entry() {
        let shard = spawn_shard(0, Duration::from_secs(30));
        let first = Arc::new(RequestCounters::new(10));
        let second = Arc::new(RequestCounters::new(20));

        shard.track(id("abc"), first).await;
        shard.track(id("abc"), second).await;

        let snap = shard.collect(id("abc")).await.expect("entry present");
        assert_eq!(snap.request_size, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn tombstone_is_reaped_after_ttl() {
        let shard = spawn_shard(0, Duration::from_millis(50));
        let counters = Arc::new(RequestCounters::new(10));
        shard.track(id("abc"), counters).await;
        shard.complete(id("abc")).await;

        assert!(shard.collect(id("abc")).await.is_some());

        tokio::time::advance(Duration::from_millis(200)).await;
        // Give the actor's select! loop a chance to process the fired timer.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;

        assert!(shard.collect(id("abc")).await.is_none());
    }
}
