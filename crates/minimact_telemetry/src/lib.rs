//! # minimact_telemetry - Metrics and Captured Logs
//!
//! Process-wide observability for the reconciliation core:
//!
//! - [`metrics()`]: one [`Metrics`] instance counting reconcile, learn and
//!   predict calls, with bounded latency windows
//! - [`logging`]: a `log` backend that keeps recent records in a ring buffer
//!
//! Both are cross-cutting and independent of any predictor instance. The
//! core only ever writes to them, so turning capture on or off, or
//! resetting counters, cannot change a reconcile or predict result.

pub mod logging;
pub mod metrics;

pub use logging::{CaptureLogger, LogEntry, LOG_CAPACITY};
pub use metrics::{metrics, LatencyWindow, Metrics, MetricsSnapshot, LATENCY_WINDOW};
