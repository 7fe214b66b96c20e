//! Trace sinks and report export.

/// CSV and JSON report export.
pub mod export;
/// Trace recorders.
pub mod trace;
