//! Structured Logging Configuration
//!
//! Provides configurable logging with:
//! - JSON output for log aggregation (LOG_FORMAT=json)
//! - Human-readable output for interactive use (default)
//!
//! # Usage
//!
//! ```rust,ignore
//! use kadm_common::logging::init_logging;
//!
//! fn main() {
//!     init_logging("kadm5-admin");
//!
//!     // Use tracing macros with structured fields
//!     tracing::info!(principal = %name, "Principal created");
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: Set to "json" for JSON output, anything else for text (default: text)
//! - `RUST_LOG`: Standard log level filter (default: info)
//!   Examples: `RUST_LOG=debug`, `RUST_LOG=kadm5=trace`
//!
//! Secret material is never passed to the logging macros by the library crates;
//! callers embedding them should keep it that way.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    /// Parse the value of `LOG_FORMAT`. Anything other than "json" is text.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }
}

/// Initialize logging with the given service name.
///
/// Reads LOG_FORMAT env var to determine output format:
/// - "json" -> JSON output (for log aggregation)
/// - anything else -> human-readable text
///
/// Reads RUST_LOG env var for log level filtering (defaults to INFO).
/// A second call is ignored, so test harnesses may call this freely.
pub fn init_logging(service_name: &str) {
    let installed = match LogFormat::from_env() {
        LogFormat::Json => init_json_logging(default_filter()),
        LogFormat::Text => init_text_logging(default_filter()),
    };

    if installed {
        tracing::debug!(service = service_name, "Logging initialized");
    }
}

/// Initialize logging with defaults (uses "kadm5" as service name).
pub fn init_default_logging() {
    init_logging("kadm5");
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize JSON logging. Returns false if a global subscriber already exists.
fn init_json_logging(env_filter: EnvFilter) -> bool {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(false)
                .with_target(true)
                .flatten_event(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .try_init()
        .is_ok()
}

/// Initialize human-readable text logging. Returns false if a global subscriber already exists.
fn init_text_logging(env_filter: EnvFilter) -> bool {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(true),
        )
        .try_init()
        .is_ok()
}
