//! Structured event definitions for logging.
//!
//! Every event carries the run id and the pipeline stage it belongs to.

use serde::{Deserialize, Serialize};

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Count fields to ratio features.
    Transform,
    /// Column z-scoring.
    Standardize,
    /// EM restarts for one candidate.
    Fit,
    /// Information-criterion comparison.
    Select,
    /// Posterior assignment.
    Classify,
    /// Joining results to unit identifiers.
    Merge,
    /// Rendering the payload.
    Output,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Transform => "transform",
            Stage::Standardize => "standardize",
            Stage::Fit => "fit",
            Stage::Select => "select",
            Stage::Classify => "classify",
            Stage::Merge => "merge",
            Stage::Output => "output",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";

    pub const TRANSFORM_FINISHED: &str = "transform.finished";
    pub const STANDARDIZE_FINISHED: &str = "standardize.finished";

    // Fit stage
    pub const FIT_RESTART_DONE: &str = "fit.restart_done";
    pub const FIT_CANDIDATE_DONE: &str = "fit.candidate_done";
    pub const FIT_MONOTONICITY_VIOLATION: &str = "fit.monotonicity_violation";

    pub const SELECT_FINISHED: &str = "select.finished";
    pub const CLASSIFY_FINISHED: &str = "classify.finished";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation context shared by every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
        }
    }

    /// Span tagging everything emitted inside it with this run and `stage`.
    ///
    /// Events from estimator code carry no context of their own; the JSONL
    /// layer fills `run_id` and `stage` from the innermost enclosing span.
    pub fn span(&self, stage: Stage) -> tracing::Span {
        tracing::info_span!("stage", run_id = %self.run_id, stage = %stage)
    }
}
