use crate::body::CountedBody;
use crate::counters::RequestCounters;
use crate::progress_id::ProgressId;
use crate::registry::Registry;
use crate::request::TrackHandle;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;

/// Query-string key recognized on any tracked URL, per §6.2.
pub const QUERY_KEY: &str = "X-Progress-Id";

/// Everything a request handler needs from the host: just the shared
/// registry. `show` fans out to every shard regardless of who's asking, so
/// it needs no notion of "its" worker; `track` derives one below.
pub struct Worker {
    pub registry: Arc<Registry>,
}

/// Picks the shard a connection's tracked uploads are pinned to.
///
/// A real single-threaded-event-loop-per-worker server gives every request
/// true worker-thread affinity for free; an ordinary Tokio/Axum server does
/// not expose that, so affinity here is derived from the peer address
/// instead of which OS thread happens to poll the request (see DESIGN.md).
/// Hashing the address rather than round-robining a counter keeps the same
/// connection pinned to the same shard for its whole lifetime without any
/// shared mutable state. This does not change the sharding semantics
/// themselves — which shard owns an upload is still fixed for its lifetime
/// and picked independently of where a later `show` request lands.
fn shard_index_for(registry: &Registry, addr: SocketAddr) -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    addr.hash(&mut hasher);
    (hasher.finish() as usize) % registry.worker_count()
}

/// `progress.track`, implemented as Axum middleware wrapping whichever
/// handler serves the tracked upload route. Always falls through to `next`
/// — track never short-circuits the pipeline (§4.4).
pub async fn track_middleware(
    State(worker): State<Arc<Worker>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let config = worker.registry.config();
    let method = req.method().clone();

    if !config.methods.contains(&method) {
        return next.run(req).await;
    }

    if req.extensions().get::<Arc<TrackHandle>>().is_some() {
        tracing::warn!("request is already linked to a tracking entry");
        crate::metrics_server::record_track_outcome(false);
        return next.run(req).await;
    }

    let Some(id) = params.get(QUERY_KEY).and_then(|v| ProgressId::parse(v)) else {
        if config.debug {
            tracing::debug!("no usable X-Progress-Id on tracked request");
        }
        crate::metrics_server::record_track_outcome(false);
        return next.run(req).await;
    };

    let request_size = content_length(req.headers());

    let counters = Arc::new(RequestCounters::new(request_size));
    let shard_index = shard_index_for(&worker.registry, addr);
    let shard = worker.registry.shard(shard_index).clone();
    shard.track(id.clone(), counters.clone()).await;

    // From here on the request side only ever goes through the handle —
    // it, not a separately-threaded `counters` variable, is the single
    // Request→Entry back-reference described in §3.
    let handle = Arc::new(TrackHandle::new(id, shard, counters));
    crate::metrics_server::record_track_outcome(true);

    let (mut parts, body) = req.into_parts();
    parts.extensions.insert(handle.clone());
    let in_counters = handle.counters().clone();
    let body = CountedBody::new(body, move |n| in_counters.add_bytes_in(n), || {});
    let req = Request::from_parts(parts, axum::body::Body::new(body));

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let response_size = content_length(response.headers());
    handle.counters().set_response_size(response_size);

    let (parts, body) = response.into_parts();
    let out_counters = handle.counters().clone();
    let body = CountedBody::new(
        body,
        move |n| out_counters.add_bytes_out(n),
        move || {
            handle.counters().set_status_code(status);
            tokio::spawn(async move { handle.complete().await });
        },
    );
    Response::from_parts(parts, axum::body::Body::new(body))
}

fn content_length(headers: &http::HeaderMap) -> u64 {
    headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
