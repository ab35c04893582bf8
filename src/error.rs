use thiserror::Error;

/// Errors surfaced while building a [`crate::config::ProgressConfig`] from
/// directive-style values. These are synchronous, setup-time failures —
/// nothing here is raised once the registry is serving requests.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("progress.ttl requires a positive integer number of seconds, got {value:?}")]
    InvalidTtl { value: String },

    #[error("unknown HTTP method {method:?} in progress.methods")]
    UnknownMethod { method: String },

    #[error("unknown progress.show format {format:?}, expected one of legacy/json/jsonp/dump")]
    UnknownFormat { format: String },

    #[error("{directive} takes no arguments, but {given} were given")]
    UnexpectedArgument { directive: &'static str, given: usize },
}
