use crate::error::ConfigError;
use std::time::Duration;

/// Default tombstone time-to-live, per §6.1.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// A bitset of tracked HTTP methods, keyed by [`http::Method`].
///
/// Default is `{POST}`. Backed by a small `Vec` rather than a real bitmap:
/// the method set is configured once at startup and checked a handful of
/// times per request, so there's no hot-path reason to pack it tighter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedMethods(Vec<http::Method>);

impl Default for TrackedMethods {
    fn default() -> Self {
        TrackedMethods(vec![http::Method::POST])
    }
}

impl TrackedMethods {
    pub fn contains(&self, method: &http::Method) -> bool {
        self.0.iter().any(|m| m == method)
    }

    /// Parses the `progress.methods` directive: a list of HTTP method names,
    /// matched case-sensitively against the server's method table. An
    /// unrecognized name is a config error.
    pub fn parse(names: &[&str]) -> Result<Self, ConfigError> {
        let mut methods = Vec::with_capacity(names.len());
        for name in names {
            let method = http::Method::from_bytes(name.as_bytes()).map_err(|_| {
                ConfigError::UnknownMethod {
                    method: name.to_string(),
                }
            })?;
            methods.push(method);
        }
        Ok(TrackedMethods(methods))
    }
}

/// Output framing for the `show` action, per §6.1/§6.2. `Dump` is reserved
/// and currently renders identically to `Json` — preserved verbatim rather
/// than guessed at, per §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    Json,
    Legacy,
    Jsonp,
    Dump,
}

impl Default for ShowFormat {
    fn default() -> Self {
        ShowFormat::Json
    }
}

impl ShowFormat {
    /// Parses the optional `progress.show [format]` argument. A missing
    /// argument defaults to `json`; anything else not in the known set is a
    /// config error.
    pub fn parse(format: Option<&str>) -> Result<Self, ConfigError> {
        match format {
            None => Ok(ShowFormat::Json),
            Some("json") => Ok(ShowFormat::Json),
            Some("legacy") => Ok(ShowFormat::Legacy),
            Some("jsonp") => Ok(ShowFormat::Jsonp),
            Some("dump") => Ok(ShowFormat::Dump),
            Some(other) => Err(ConfigError::UnknownFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Parses the `progress.ttl <seconds>` directive.
pub fn parse_ttl(value: &str) -> Result<Duration, ConfigError> {
    let seconds: u64 = value.parse().map_err(|_| ConfigError::InvalidTtl {
        value: value.to_string(),
    })?;
    if seconds == 0 {
        return Err(ConfigError::InvalidTtl {
            value: value.to_string(),
        });
    }
    Ok(Duration::from_secs(seconds))
}

/// `progress.track` and the no-argument cases of `progress.show` both take
/// zero arguments; reject anything else with a uniform error.
pub fn expect_no_arguments(directive: &'static str, args: &[&str]) -> Result<(), ConfigError> {
    if !args.is_empty() {
        return Err(ConfigError::UnexpectedArgument {
            directive,
            given: args.len(),
        });
    }
    Ok(())
}

/// Process-wide and per-scope configuration for the progress subsystem.
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    pub ttl: Duration,
    pub debug: bool,
    pub methods: TrackedMethods,
    pub format: ShowFormat,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        ProgressConfig {
            ttl: DEFAULT_TTL,
            debug: false,
            methods: TrackedMethods::default(),
            format: ShowFormat::default(),
        }
    }
}
