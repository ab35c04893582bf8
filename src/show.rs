use crate::progress_id::ProgressId;
use crate::registry::CollectOutcome;
use crate::render::{render, sanitize_callback, state_tag};
use crate::track::Worker;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Query-string key for the id to look up, per §6.2.
pub const ID_QUERY_KEY: &str = "X-Progress-Id";
/// Query-string key for the jsonp callback name, only consulted when the
/// configured format is `jsonp`.
pub const CALLBACK_QUERY_KEY: &str = "X-Progress-Callback";

/// `progress.show`, implemented as an Axum handler. Fans the lookup out to
/// every shard via [`crate::registry::Registry::collect`] and renders the
/// first match in the configured format.
///
/// A request's abandonment is modeled via an optional [`CancellationToken`]
/// extension — a host layer can insert one and cancel it when it detects
/// the client has gone away. Without one, the collect simply runs to
/// completion (there is nothing to cancel against), which is the common
/// case for an ordinary request/response HTTP server: if the connection
/// really does drop, Axum drops this handler's future outright and nothing
/// past that point ever executes, which is its own, simpler form of the
/// same "no response on cancellation" guarantee.
pub async fn show_handler(
    State(worker): State<Arc<Worker>>,
    Query(params): Query<HashMap<String, String>>,
    cancelled: Option<Extension<CancellationToken>>,
) -> Response {
    let Some(id) = params
        .get(ID_QUERY_KEY)
        .and_then(|v| ProgressId::parse(v))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let format = worker.registry.config().format;
    let callback = sanitize_callback(params.get(CALLBACK_QUERY_KEY).map(String::as_str));

    let outcome = collect(&worker, id, cancelled).await;

    match outcome {
        CollectOutcome::Cancelled => {
            // The request was abandoned mid-collect; per §4.5, no response
            // body is ever written for this case.
            crate::metrics_server::record_show_outcome("cancelled");
            StatusCode::NO_CONTENT.into_response()
        }
        CollectOutcome::Completed(snapshot) => {
            crate::metrics_server::record_show_outcome(state_tag(snapshot));
            let body = render(format, snapshot, callback);
            (StatusCode::OK, body).into_response()
        }
    }
}

async fn collect(
    worker: &Worker,
    id: ProgressId,
    cancelled: Option<Extension<CancellationToken>>,
) -> CollectOutcome {
    let cancel_signal = async move {
        match cancelled {
            Some(Extension(token)) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };
    worker.registry.collect(id, cancel_signal).await
}
