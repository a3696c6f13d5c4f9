// crates/grid-monitor/src/error.rs
// ============================================================================
// Module: Monitor Errors
// ============================================================================

use thiserror::Error;

/// Errors the monitoring loop can surface. Per spec.md §7, none of these
/// are fatal to the process: a cycle that returns one of these is logged
/// and the next cycle proceeds.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The power-flow solver did not converge this cycle.
    #[error("power flow did not converge: {0}")]
    NonConvergent(String),
    /// A zone's `execute_safety_rules` call exceeded its 10 s budget.
    #[error("zone {0} safety rule evaluation timed out")]
    ZoneTimeout(String),
    /// The escalation directive's agent query exceeded its 300 s budget.
    #[error("escalation query to the strategic agent timed out")]
    EscalationTimeout,
    /// The agent query itself failed (distinct from timing out).
    #[error("escalation query failed: {0}")]
    EscalationFailed(String),
}
