// crates/grid-core/src/violation.rs
// ============================================================================
// Module: Violation Events
// Description: Constraint-violation kinds and the immutable event type used
//              by the facade's detector and by the zone protection engine.
// Purpose: Give every consumer (C1, C7, C10) one shared, serializable shape
//          for "something is out of limits".
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! A [`ViolationEvent`] is a fact, not a decision: it says a component is
//! outside its configured limit, at a point in time, by how much. Deciding
//! what to do about it is `grid-zone`'s and `grid-agent`'s job.

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ZoneId;
use crate::time::Timestamp;

/// The kind of constraint a violation concerns.
///
/// # Invariants
/// - Variants are stable for serialization and dashboard contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Bus voltage below the zone's under-voltage threshold.
    VoltageLow,
    /// Bus voltage above the zone's over-voltage threshold.
    VoltageHigh,
    /// Line loading above the zone's thermal threshold.
    Thermal,
    /// System frequency outside its nominal band.
    Frequency,
}

/// Violation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Outside limits but not yet dangerous.
    Warning,
    /// Outside limits and requiring prompt correction.
    Critical,
}

/// An immutable record of a constraint violation at a point in time.
///
/// # Invariants
/// - `measured` and `limit` are in the same unit (p.u. for voltage, percent
///   for thermal, Hz for frequency).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    /// Kind of violation.
    pub kind: ViolationKind,
    /// Zone the affected component belongs to (frequency has no owner zone
    /// and is reported against every zone it is evaluated for).
    pub zone: Option<ZoneId>,
    /// Severity.
    pub severity: Severity,
    /// Stable identifier of the affected component (e.g. `"bus7"`,
    /// `"line3"`).
    pub component: String,
    /// Measured value at evaluation time.
    pub measured: f64,
    /// The limit that was exceeded.
    pub limit: f64,
    /// Wall-clock time of evaluation.
    pub at: Timestamp,
}

impl ViolationEvent {
    /// Deviation of `measured` from nominal (1.0), used to decide whether a
    /// pre-existing violation has "measurably worsened" (facade §4.1).
    ///
    /// Matches `_check_violations`'s worsening check in the system this
    /// control plane was distilled from (`src/simulation/power_grid.py`):
    /// `abs(new_val - 1.0) > abs(old_val - 1.0) + 0.05` against the raw
    /// measured value, not a limit-relative ratio. The additive 0.05 budget
    /// is compared in the same unit as `measured` (p.u. for voltage, percent
    /// for thermal, Hz for frequency), exactly as the original compares it.
    #[must_use]
    pub fn deviation_from_nominal(&self) -> f64 {
        (self.measured - 1.0).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(measured: f64, limit: f64) -> ViolationEvent {
        ViolationEvent {
            kind: ViolationKind::VoltageLow,
            zone: Some(ZoneId::Zone1),
            severity: Severity::Warning,
            component: "bus0".to_string(),
            measured,
            limit,
            at: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn deviation_from_nominal_grows_as_measured_moves_away_from_one() {
        let near = event(0.94, 0.95);
        let far = event(0.80, 0.95);
        assert!(far.deviation_from_nominal() > near.deviation_from_nominal());
    }
}
