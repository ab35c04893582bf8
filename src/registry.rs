use crate::config::ProgressConfig;
use crate::counters::ProgressSnapshot;
use crate::progress_id::ProgressId;
use crate::shard::{spawn_shard, ShardHandle};
use std::sync::{Arc, OnceLock};

/// The process-wide collection of per-worker shards.
///
/// §4.6 describes a hand-rolled atomic barrier (0 → 1 → 2) so that exactly
/// one worker allocates the shard array while the others spin until it's
/// published. `std::sync::OnceLock` already gives that exact guarantee —
/// uninitialized → initializing → initialized, with every other caller
/// blocking on the one in-flight initializer rather than spinning — so
/// there's no reason to reimplement it by hand. See DESIGN.md for the
/// corresponding Open Question resolution.
pub struct Registry {
    shards: Vec<ShardHandle>,
    config: ProgressConfig,
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

impl Registry {
    /// Allocates `worker_count` shards, one Tokio task each.
    ///
    /// Used directly by [`Registry::global`]'s lazy initializer, and
    /// available to callers (tests, embedders that don't want the
    /// process-wide singleton) who need an isolated registry of their own
    /// rather than the one shared `GLOBAL` instance.
    pub fn new(worker_count: usize, config: ProgressConfig) -> Self {
        let shards = (0..worker_count)
            .map(|index| spawn_shard(index, config.ttl))
            .collect();
        Registry { shards, config }
    }

    /// Returns the process-wide registry, allocating it on first call.
    /// Every worker that races to call this before the first allocation
    /// completes observes the same published `Arc` — none of them touch a
    /// half-built shard array.
    pub fn global(worker_count: usize, config: ProgressConfig) -> Arc<Registry> {
        GLOBAL
            .get_or_init(|| Arc::new(Registry::new(worker_count, config)))
            .clone()
    }

    pub fn worker_count(&self) -> usize {
        self.shards.len()
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    pub fn shard(&self, index: usize) -> &ShardHandle {
        &self.shards[index % self.shards.len()]
    }

    /// Scatter/gathers a lookup of `id` across every shard, including the
    /// caller's own. Returns the first non-null result in worker order, per
    /// §4.5 — cross-shard id collisions are not detected, first-found wins.
    ///
    /// If `cancelled` resolves before every shard has replied, the collect
    /// is abandoned and reported as [`CollectOutcome::Cancelled`] rather
    /// than as a completed-but-empty lookup: the two must stay distinct, a
    /// cancelled collect must never render `{"state":"unknown"}` (§4.5's
    /// "do NOT emit a response" path).
    pub async fn collect(
        &self,
        id: ProgressId,
        cancelled: impl std::future::Future<Output = ()>,
    ) -> CollectOutcome {
        let gather = async {
            let replies = futures::future::join_all(
                self.shards.iter().map(|shard| shard.collect(id.clone())),
            )
            .await;
            replies.into_iter().flatten().next()
        };

        tokio::select! {
            result = gather => CollectOutcome::Completed(result),
            _ = cancelled => CollectOutcome::Cancelled,
        }
    }
}

/// The result of a scatter/gather collect, distinguishing "completed, found
/// nothing" from "abandoned because the request was cancelled mid-wait".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    Completed(Option<ProgressSnapshot>),
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::RequestCounters;
    use std::time::Duration;

    fn id(s: &str) -> ProgressId {
        ProgressId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn collect_finds_entry_on_any_shard() {
        let registry = Registry::new(4, ProgressConfig::default());
        let counters = Arc::new(RequestCounters::new(10));
        registry.shard(3).track(id("abc"), counters).await;

        let never = std::future::pending();
        let outcome = registry.collect(id("abc"), never).await;
        assert!(matches!(outcome, CollectOutcome::Completed(Some(_))));
    }

    #[tokio::test]
    async fn collect_returns_completed_none_for_unknown_id() {
        let registry = Registry::new(4, ProgressConfig::default());
        let never = std::future::pending();
        assert_eq!(
            registry.collect(id("nope"), never).await,
            CollectOutcome::Completed(None)
        );
    }

    #[tokio::test]
    async fn collect_reports_cancelled_distinctly_from_not_found() {
        let registry = Registry::new(4, ProgressConfig::default());
        let already_cancelled = async {};
        assert_eq!(
            registry.collect(id("abc"), already_cancelled).await,
            CollectOutcome::Cancelled
        );
    }

    #[tokio::test]
    async fn global_is_allocated_once() {
        let a = Registry::global(2, ProgressConfig::default());
        let b = Registry::global(
            8,
            ProgressConfig {
                ttl: Duration::from_secs(99),
                ..ProgressConfig::default()
            },
        );
        // The second call's arguments are ignored: the first call won the
        // init race and published its own shard count and config.
        assert_eq!(a.worker_count(), b.worker_count());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
