// crates/grid-core/src/telemetry.rs
// ============================================================================
// Module: Telemetry
// Description: Dependency-light observability hook shared by every crate in
//              the workspace.
// Purpose: Provide counters and latency buckets without committing the
//          workspace to a specific metrics backend.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The workspace carries no hard dependency on a metrics or logging crate —
//! the same choice the teacher repository makes. [`Metrics`] is a narrow
//! trait; [`NoopMetrics`] is the default, and a deployment wires in
//! Prometheus/OpenTelemetry or similar by implementing the trait, not by
//! forking this crate.

use std::time::Duration;

/// Latency bucket boundaries, milliseconds, used by every component that
/// records a histogram through [`Metrics::observe_latency`].
pub const DEFAULT_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

/// A metric event recorded by a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricEvent<'a> {
    /// Component-defined counter name (e.g. `"monitor.cycle"`,
    /// `"guardian.verdict"`).
    pub name: &'a str,
    /// Component-defined outcome label (e.g. `"ok"`, `"escalated"`,
    /// `"timeout"`).
    pub outcome: &'a str,
}

/// Narrow observability hook used throughout the control plane.
///
/// # Invariants
/// - Implementations must never panic or block meaningfully; telemetry is
///   an observer, not on the critical path (spec.md §4.3, §7).
pub trait Metrics: Send + Sync {
    /// Increments a counter for the given event.
    fn record(&self, event: MetricEvent<'_>);

    /// Observes a latency sample for the given counter name.
    fn observe_latency(&self, name: &str, latency: Duration);
}

/// A [`Metrics`] implementation that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn record(&self, _event: MetricEvent<'_>) {}
    fn observe_latency(&self, _name: &str, _latency: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_metrics_never_panics() {
        let metrics = NoopMetrics;
        metrics.record(MetricEvent { name: "test", outcome: "ok" });
        metrics.observe_latency("test", Duration::from_millis(5));
    }
}
