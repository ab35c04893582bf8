use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a `tracing_subscriber` pipeline: structured output on stderr,
/// filtered by `RUST_LOG` (defaulting to `info`). The reference codebase's
/// own `logging::install()` layers a custom per-task log forwarder on top
/// of this same base for shipping logs to a remote journal; this crate has
/// no such destination, so only the base `fmt` + `EnvFilter` layer survives
/// the transform.
pub fn install() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();
}
