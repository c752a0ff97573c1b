//! Logging setup for schema inference
//!
//! Pipeline stages open `tracing` spans and emit counts at `debug`/`trace`;
//! every diagnostic pushed into a [`Diagnostics`](crate::core::Diagnostics)
//! collector is mirrored as an event as well. This module installs the
//! global subscriber that writes those events to stderr.
//!
//! The level is taken from the explicit argument, then
//! `DRAWSCHEMA_LOG_LEVEL`, then `RUST_LOG`, and defaults to `info`. The
//! format comes from the argument, then `DRAWSCHEMA_LOG_FORMAT`, and
//! defaults to `compact`.
//!
//! ```rust,no_run
//! use drawschema::core::logging::init_logging;
//!
//! init_logging(Some("debug"), Some("json")).unwrap();
//! ```
//!
//! Levels accept full `EnvFilter` directives:
//!
//! ```bash
//! DRAWSCHEMA_LOG_LEVEL="info,drawschema::pipeline::direction=trace" drawschema plan -i graph.xml
//! ```

use std::str::FromStr;

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::core::error::SchemaError;

const LEVEL_VAR: &str = "DRAWSCHEMA_LOG_LEVEL";
const FORMAT_VAR: &str = "DRAWSCHEMA_LOG_FORMAT";
const FALLBACK_LEVEL_VAR: &str = "RUST_LOG";

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One line per event, no targets
    #[default]
    Compact,
    /// Multi-line with source locations and span activity
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(SchemaError::config_error(format!(
                "unknown log format '{}' (expected one of {})",
                s,
                LogFormat::variants().join(", ")
            ))),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Level directive and format after argument/environment precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directive: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// Resolve against the process environment
    pub fn resolve(level: Option<&str>, format: Option<&str>) -> Result<Self, SchemaError> {
        Self::resolve_with(level, format, |name| std::env::var(name).ok())
    }

    /// Resolve with `env` looking up environment variables by name
    pub fn resolve_with(
        level: Option<&str>,
        format: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SchemaError> {
        let directive = level
            .map(str::to_string)
            .or_else(|| env(LEVEL_VAR))
            .or_else(|| env(FALLBACK_LEVEL_VAR))
            .unwrap_or_else(|| "info".to_string());
        let format = match format.map(str::to_string).or_else(|| env(FORMAT_VAR)) {
            Some(name) => name.parse()?,
            None => LogFormat::default(),
        };
        Ok(Self { directive, format })
    }

    /// Filter built from the resolved directive only
    pub fn filter(&self) -> Result<EnvFilter, SchemaError> {
        EnvFilter::try_new(&self.directive).map_err(|e| {
            SchemaError::config_error(format!("invalid log level '{}': {}", self.directive, e))
        })
    }
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    // stderr keeps stdout free for JSON output.
    let layer = fmt::layer().with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => layer.compact().with_target(false).boxed(),
        LogFormat::Pretty => layer
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::ACTIVE)
            .boxed(),
        LogFormat::Json => layer
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::ACTIVE)
            .boxed(),
    }
}

/// Install the global tracing subscriber
///
/// Fails on an unknown format, an unparsable level directive, or when a
/// global subscriber is already installed.
pub fn init_logging(level: Option<&str>, format: Option<&str>) -> Result<(), SchemaError> {
    let settings = LogSettings::resolve(level, format)?;
    tracing_subscriber::registry()
        .with(settings.filter()?)
        .with(fmt_layer(settings.format))
        .try_init()
        .map_err(|e| SchemaError::config_error(format!("cannot install logger: {}", e)))
}
