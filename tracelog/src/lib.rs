//! Execution-trace log reconstruction.
//!
//! Rebuilds the human-readable log of one node (or of a whole run) from
//! whichever telemetry the viewer currently holds: a node-local log, the
//! live trace stream, or the legacy run-log buffer.

pub mod config;
pub mod format;
pub mod nodes;
pub mod normalize;
pub mod payload;
pub mod pipeline;
pub mod snapshot;
pub mod source;
pub mod turn;

pub use format::FormatOptions;
pub use pipeline::build_run_log;
pub use trace_types::{DisplayEntry, LogRequest, LogSource, RunLog};
