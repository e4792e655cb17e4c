//! Relay Call Metrics
//!
//! Aggregates the per-call diagnostics reports emitted by the service caller
//! into counters and latency percentiles.
//!
//! # Architecture
//!
//! - [`MetricsRegistry`]: thread-safe storage with lock-free counters
//! - [`CallMetricsCollector`]: a [`CallObserver`](relay_common::CallObserver)
//!   that records every report into a registry
//! - [`MetricsSnapshot`]: serializable point-in-time view
//!
//! # What Is Tracked
//!
//! - Logical calls, successes, failures, attempts and failovers
//! - Failed attempts and failed calls per [`FailureCategory`](relay_common::FailureCategory)
//! - Per-method call counts and latency (avg, P50, P95, P99)
//! - Per-target attempt, success and failure counts, keyed by target checksum

mod collector;
mod registry;
mod snapshot;

pub use collector::CallMetricsCollector;
pub use registry::{MetricsConfig, MetricsRegistry};
pub use snapshot::{MethodMetrics, MetricsSnapshot, TargetMetrics};
