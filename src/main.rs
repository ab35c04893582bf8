use anyhow::Context;
use axum::routing::post;
use clap::Parser;
use mod_progress::{config, logging, registry::Registry, show, track, Worker};
use std::net::SocketAddr;
use std::sync::Arc;

/// Demo HTTP host exercising the upload-progress tracking subsystem: a
/// `POST /upload` route wrapped in `progress.track` middleware, and a
/// `GET /progress` route serving `progress.show`.
#[derive(Debug, Parser)]
#[command(about, version)]
struct Cli {
    /// Tombstone time-to-live, once a tracked request completes.
    #[arg(long, env = "PROGRESS_TTL", value_parser = humantime::parse_duration, default_value = "30s")]
    ttl: std::time::Duration,

    /// Enables verbose per-request tracking diagnostics.
    #[arg(long, env = "PROGRESS_DEBUG", action(clap::ArgAction::SetTrue))]
    debug: bool,

    /// HTTP methods to track, given as a comma-separated list.
    #[arg(long, env = "PROGRESS_METHODS", value_delimiter = ',', default_value = "POST")]
    methods: Vec<String>,

    /// Output format used by `progress.show`.
    #[arg(long, env = "PROGRESS_FORMAT", default_value = "json")]
    format: String,

    /// Number of per-worker shards to allocate.
    #[arg(long, env = "PROGRESS_WORKERS", default_value = "4")]
    workers: usize,

    /// Address to listen on.
    #[arg(long, env = "PROGRESS_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Address to serve `/metrics` on.
    #[arg(long, env = "PROGRESS_METRICS_LISTEN", default_value = "127.0.0.1:8081")]
    metrics_listen: SocketAddr,
}

impl Cli {
    fn progress_config(&self) -> anyhow::Result<config::ProgressConfig> {
        let method_refs: Vec<&str> = self.methods.iter().map(String::as_str).collect();
        Ok(config::ProgressConfig {
            ttl: self.ttl,
            debug: self.debug,
            methods: config::TrackedMethods::parse(&method_refs)
                .context("invalid --methods value")?,
            format: config::ShowFormat::parse(Some(&self.format))
                .context("invalid --format value")?,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::install();

    let cli = Cli::parse();
    let config = cli.progress_config()?;

    tracing::info!(workers = cli.workers, ttl = ?config.ttl, "starting mod-progress");

    let registry = Registry::global(cli.workers, config);
    let worker = Arc::new(Worker {
        registry: registry.clone(),
    });

    let app = axum::Router::new()
        .route(
            "/upload",
            post(|| async { axum::http::StatusCode::OK })
                .layer(axum::middleware::from_fn_with_state(
                    worker.clone(),
                    track::track_middleware,
                )),
        )
        .route("/progress", axum::routing::get(show::show_handler))
        .with_state(worker);

    let metrics_router = mod_progress::metrics_server::build_router();

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .context("failed to bind listen address")?;
    let metrics_listener = tokio::net::TcpListener::bind(cli.metrics_listen)
        .await
        .context("failed to bind metrics listen address")?;

    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_router).await {
            tracing::error!(%err, "metrics server exited");
        }
    });

    tracing::info!(addr = %cli.listen, "serving upload-progress demo host");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server exited")?;

    Ok(())
}
