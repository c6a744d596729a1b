//! Structured logging for tt-core.
//!
//! Two renderings of the same `tracing` events: `fmt` lines for people and
//! [`JsonlLayer`] objects for batch pipelines. Both write to stderr because
//! stdout carries the command payload.
//!
//! Pipeline code logs through [`log_event!`](crate::log_event) with a
//! [`LogContext`]; estimator code logs plain events and picks up the run id
//! from the span opened by [`LogContext::span`].

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directive()));
    let registry = tracing_subscriber::registry().with(filter);

    let _ = match config.format {
        LogFormat::Human => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(config.ansi && std::io::stderr().is_terminal()),
            )
            .try_init(),
        LogFormat::Jsonl => registry.with(JsonlLayer::stderr()).try_init(),
    };
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("run-{}", &uuid.simple().to_string()[..12])
}

/// Emit a tracing event tagged with the run id, stage, and event name.
///
/// `$level` is a `tracing::Level` constant name (`INFO`, `WARN`, ...).
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::SELECT_FINISHED, Stage::Select, "selection done",
///     candidates = 24);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, $level:ident, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::event!(
            tracing::Level::$level,
            event = $event,
            run_id = %$ctx.run_id,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
}
