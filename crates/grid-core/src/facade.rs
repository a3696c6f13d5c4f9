// crates/grid-core/src/facade.rs
// ============================================================================
// Module: Simulation Facade (C1)
// Description: Single owner of the authoritative grid state; reads,
//              mutations, snapshot/rollback, and sandboxed validation.
// Purpose: Give every other component exactly one way to observe or change
//          electrical state, with non-convergence and unsafe actions made
//          impossible to observe.
// Dependencies: crate::{state, solver, violation, zone, identifiers, time}
// ============================================================================

//! ## Overview
//! `SimulationFacade` is the only thing in the workspace that owns a
//! `GridState` by value. Every mutation reruns the power-flow solver; a
//! non-convergent mutation is reverted before the call returns (spec.md
//! §4.1). `validate_action` is the sandbox contract every actuator and the
//! guardian rely on: try a mutation, measure the violation delta, always
//! roll back.

use std::collections::HashMap;

use thiserror::Error;

use crate::identifiers::BusId;
use crate::identifiers::GeneratorId;
use crate::identifiers::LineId;
use crate::identifiers::LoadId;
use crate::identifiers::ShuntId;
use crate::identifiers::TransformerId;
use crate::solver::PowerFlowSolver;
use crate::solver::SolveError;
use crate::state::GridState;
use crate::time::Timestamp;
use crate::violation::Severity;
use crate::violation::ViolationEvent;
use crate::violation::ViolationKind;
use crate::zone::ZoneDescriptor;

/// Protection thresholds used by the facade's own detector and, by default,
/// by every zone descriptor in `grid-zone` unless overridden.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectionThresholds {
    /// Under-voltage threshold, per-unit.
    pub under_voltage_pu: f64,
    /// Over-voltage threshold, per-unit.
    pub over_voltage_pu: f64,
    /// Maximum line loading, percent.
    pub max_line_loading_percent: f64,
    /// Allowed frequency deviation from nominal, Hz.
    pub frequency_band_hz: f64,
}

impl Default for ProtectionThresholds {
    fn default() -> Self {
        Self {
            under_voltage_pu: 0.95,
            over_voltage_pu: 1.05,
            max_line_loading_percent: 100.0,
            frequency_band_hz: 0.5,
        }
    }
}

/// Errors reported by the simulation facade.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FacadeError {
    /// The mutation's resulting state failed to converge; it was reverted.
    #[error("mutation did not converge and was reverted: {0}")]
    NonConvergent(String),
    /// A referenced component does not exist.
    #[error("component not found: {0}")]
    ComponentNotFound(String),
    /// `restore_snapshot` was called with an out-of-range index, or the
    /// snapshot stack was empty.
    #[error("no snapshot at index {0}")]
    NoSuchSnapshot(usize),
}

impl From<SolveError> for FacadeError {
    fn from(err: SolveError) -> Self {
        match err {
            SolveError::NonConvergent { reason } => Self::NonConvergent(reason),
        }
    }
}

/// An immutable, timestamped copy of `GridState` used for sandboxing and
/// rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// The captured state.
    pub state: GridState,
    /// When the snapshot was taken.
    pub at: Timestamp,
}

/// The outcome of `validate_action`: whether the sandboxed mutation is safe
/// to commit for real, and the evidence behind that decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Whether the action is safe to commit.
    pub safe: bool,
    /// Violations present before the sandboxed mutation.
    pub pre_violations: Vec<ViolationEvent>,
    /// Violations present after the sandboxed mutation (pre-restore).
    pub post_violations: Vec<ViolationEvent>,
    /// Violations on components that were not violating before.
    pub new_violations: Vec<ViolationEvent>,
    /// Pre-existing violations whose deviation from limit grew by more than
    /// 5%.
    pub worsened_violations: Vec<ViolationEvent>,
    /// Set when the sandboxed mutation itself failed to converge.
    pub non_convergent: bool,
}

/// Single owner of the authoritative electrical state (C1).
pub struct SimulationFacade {
    state: GridState,
    solver: Box<dyn PowerFlowSolver + Send + Sync>,
    snapshots: Vec<Snapshot>,
    thresholds: ProtectionThresholds,
}

impl SimulationFacade {
    /// Constructs a facade over `state`, using `solver` for every mutation.
    #[must_use]
    pub fn new(state: GridState, solver: Box<dyn PowerFlowSolver + Send + Sync>) -> Self {
        Self { state, solver, snapshots: Vec::new(), thresholds: ProtectionThresholds::default() }
    }

    /// Constructs a facade over the canonical 30-bus case with the
    /// reference solver.
    #[must_use]
    pub fn with_canonical_case() -> Self {
        Self::new(crate::fixtures::canonical_30_bus_case(), Box::new(crate::solver::ReferenceSolver))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The current grid state, read-only.
    #[must_use]
    pub fn state(&self) -> &GridState {
        &self.state
    }

    /// The protection thresholds used by this facade's own detector.
    #[must_use]
    pub const fn thresholds(&self) -> ProtectionThresholds {
        self.thresholds
    }

    /// Overrides the facade's default detection thresholds.
    pub fn set_thresholds(&mut self, thresholds: ProtectionThresholds) {
        self.thresholds = thresholds;
    }

    /// The zone descriptors derived from the current topology.
    #[must_use]
    pub fn zone_partitions(&self) -> Vec<ZoneDescriptor> {
        ZoneDescriptor::derive_all(&self.state)
    }

    /// Reruns the power flow solver against the current state with no
    /// mutation, so bus voltages, line loadings, and losses reflect any
    /// load variation applied since the last solve (spec.md §4.10's
    /// per-cycle `run_power_flow` step).
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::NonConvergent`] if the solver fails to
    /// converge; the state is left unchanged in that case.
    pub fn run_power_flow(&mut self) -> Result<(), FacadeError> {
        self.apply_and_solve(|_state| {})
    }

    /// Detects all currently active violations, across voltage, thermal,
    /// and frequency.
    #[must_use]
    pub fn detect_violations(&self) -> Vec<ViolationEvent> {
        self.detect_violations_with(self.thresholds)
    }

    /// Detects violations using explicit thresholds (used by `grid-zone`
    /// for per-zone overrides).
    #[must_use]
    pub fn detect_violations_with(&self, thresholds: ProtectionThresholds) -> Vec<ViolationEvent> {
        let now = Timestamp::now();
        let mut events = Vec::new();
        for bus in &self.state.buses {
            if bus.vm_pu < thresholds.under_voltage_pu {
                events.push(ViolationEvent {
                    kind: ViolationKind::VoltageLow,
                    zone: Some(crate::identifiers::ZoneId::owning(bus.id)),
                    severity: severity_for_voltage(bus.vm_pu, thresholds.under_voltage_pu),
                    component: bus.id.to_string(),
                    measured: bus.vm_pu,
                    limit: thresholds.under_voltage_pu,
                    at: now,
                });
            } else if bus.vm_pu > thresholds.over_voltage_pu {
                events.push(ViolationEvent {
                    kind: ViolationKind::VoltageHigh,
                    zone: Some(crate::identifiers::ZoneId::owning(bus.id)),
                    severity: severity_for_voltage(bus.vm_pu, thresholds.over_voltage_pu),
                    component: bus.id.to_string(),
                    measured: bus.vm_pu,
                    limit: thresholds.over_voltage_pu,
                    at: now,
                });
            }
        }
        for line in &self.state.lines {
            if !line.in_service {
                continue;
            }
            if line.loading_percent > thresholds.max_line_loading_percent {
                let severity = if line.loading_percent > thresholds.max_line_loading_percent * 1.2
                {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                events.push(ViolationEvent {
                    kind: ViolationKind::Thermal,
                    zone: zone_of_line(&self.state, line.id),
                    severity,
                    component: line.id.to_string(),
                    measured: line.loading_percent,
                    limit: thresholds.max_line_loading_percent,
                    at: now,
                });
            }
        }
        let freq_low = crate::solver::NOMINAL_FREQUENCY_HZ - thresholds.frequency_band_hz;
        let freq_high = crate::solver::NOMINAL_FREQUENCY_HZ + thresholds.frequency_band_hz;
        if self.state.frequency_hz < freq_low || self.state.frequency_hz > freq_high {
            events.push(ViolationEvent {
                kind: ViolationKind::Frequency,
                zone: None,
                severity: Severity::Critical,
                component: "system".to_string(),
                measured: self.state.frequency_hz,
                limit: if self.state.frequency_hz < freq_low { freq_low } else { freq_high },
                at: now,
            });
        }
        events
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Sets a line's in-service flag.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::ComponentNotFound`] or
    /// [`FacadeError::NonConvergent`].
    pub fn set_line_in_service(&mut self, line: LineId, in_service: bool) -> Result<(), FacadeError> {
        self.ensure_line_exists(line)?;
        self.apply_and_solve(|state| {
            if let Some(l) = state.line_mut(line) {
                l.in_service = in_service;
            }
        })
    }

    /// Trips a line (equivalent to `set_line_in_service(line, false)`).
    ///
    /// # Errors
    ///
    /// See [`Self::set_line_in_service`].
    pub fn trip_line(&mut self, line: LineId) -> Result<(), FacadeError> {
        self.set_line_in_service(line, false)
    }

    /// Sets a generator's active and reactive power setpoints, clamped to
    /// its limits.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::ComponentNotFound`] or
    /// [`FacadeError::NonConvergent`].
    pub fn set_generator_output(
        &mut self,
        generator: GeneratorId,
        p_mw: f64,
        q_mvar: f64,
    ) -> Result<(), FacadeError> {
        self.ensure_generator_exists(generator)?;
        self.apply_and_solve(|state| {
            if let Some(g) = state.generator_mut(generator) {
                g.p_mw = p_mw.clamp(g.min_p_mw, g.max_p_mw);
                g.q_mvar = q_mvar.clamp(g.min_q_mvar, g.max_q_mvar);
            }
        })
    }

    /// Scales a load's active and reactive power by `factor`.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::ComponentNotFound`] or
    /// [`FacadeError::NonConvergent`].
    pub fn scale_load(&mut self, load: LoadId, factor: f64) -> Result<(), FacadeError> {
        self.ensure_load_exists(load)?;
        self.apply_and_solve(|state| {
            if let Some(l) = state.load_mut(load) {
                l.p_mw *= factor;
                l.q_mvar *= factor;
            }
        })
    }

    /// Sets a shunt compensator's in-service flag.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::ComponentNotFound`] or
    /// [`FacadeError::NonConvergent`].
    pub fn set_shunt_status(&mut self, shunt: ShuntId, in_service: bool) -> Result<(), FacadeError> {
        self.ensure_shunt_exists(shunt)?;
        self.apply_and_solve(|state| {
            if let Some(s) = state.shunt_mut(shunt) {
                s.in_service = in_service;
            }
        })
    }

    /// Injects a load delta (MW) at `bus`, added to the first load found
    /// there.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::ComponentNotFound`] when `bus` has no load, or
    /// [`FacadeError::NonConvergent`].
    pub fn inject_load_delta(&mut self, bus: BusId, delta_mw: f64) -> Result<(), FacadeError> {
        let load_id = self
            .state
            .loads_at_bus(bus)
            .next()
            .map(|l| l.id)
            .ok_or_else(|| FacadeError::ComponentNotFound(format!("load at {bus}")))?;
        self.apply_and_solve(|state| {
            if let Some(l) = state.load_mut(load_id) {
                l.p_mw += delta_mw;
            }
        })
    }

    /// Transformer winding temperature, if the transformer exists.
    #[must_use]
    pub fn transformer_temperature(&self, id: TransformerId) -> Option<f64> {
        self.state.transformers.iter().find(|t| t.id == id).map(|t| t.winding_temp_c)
    }

    // ------------------------------------------------------------------
    // Snapshot / rollback / validation (protection group)
    // ------------------------------------------------------------------

    /// Pushes an immutable copy of the current state, returning its index.
    pub fn save_snapshot(&mut self) -> usize {
        self.snapshots.push(Snapshot { state: self.state.clone(), at: Timestamp::now() });
        self.snapshots.len() - 1
    }

    /// Restores the state at `index`, truncating the stack above it.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::NoSuchSnapshot`] when `index` is out of range.
    pub fn restore_snapshot(&mut self, index: usize) -> Result<(), FacadeError> {
        let snapshot = self.snapshots.get(index).ok_or(FacadeError::NoSuchSnapshot(index))?;
        self.state = snapshot.state.clone();
        self.snapshots.truncate(index + 1);
        Ok(())
    }

    /// Runs `mutate` in a sandbox: snapshots the state, applies the
    /// mutation, measures the violation delta, then unconditionally
    /// restores the pre-mutation state (spec.md §4.1).
    ///
    /// The action is reported safe iff no violation appears on a
    /// previously clean component, and no pre-existing violation's
    /// deviation from nominal (1.0) grows by more than an additive 0.05,
    /// matching `src/simulation/power_grid.py`'s `validate_action`
    /// worsening check in the system this control plane was distilled
    /// from: `abs(new_val - 1.0) > abs(old_val - 1.0) + 0.05`.
    pub fn validate_action<F>(&mut self, mutate: F) -> ValidationOutcome
    where
        F: FnOnce(&mut Self) -> Result<(), FacadeError>,
    {
        let pre_violations = self.detect_violations();
        let index = self.save_snapshot();
        let mutation_result = mutate(self);
        let post_violations = self.detect_violations();
        let restore_result = self.restore_snapshot(index);
        debug_assert!(restore_result.is_ok(), "snapshot just pushed must be restorable");

        if mutation_result.is_err() {
            return ValidationOutcome {
                safe: false,
                pre_violations,
                post_violations: Vec::new(),
                new_violations: Vec::new(),
                worsened_violations: Vec::new(),
                non_convergent: true,
            };
        }

        let pre_by_component: HashMap<&str, &ViolationEvent> =
            pre_violations.iter().map(|v| (v.component.as_str(), v)).collect();

        let mut new_violations = Vec::new();
        let mut worsened_violations = Vec::new();
        for post in &post_violations {
            match pre_by_component.get(post.component.as_str()) {
                None => new_violations.push(post.clone()),
                Some(pre) => {
                    let pre_dev = pre.deviation_from_nominal();
                    let post_dev = post.deviation_from_nominal();
                    if post_dev > pre_dev + 0.05 {
                        worsened_violations.push(post.clone());
                    }
                }
            }
        }

        let safe = new_violations.is_empty() && worsened_violations.is_empty();
        ValidationOutcome {
            safe,
            pre_violations,
            post_violations,
            new_violations,
            worsened_violations,
            non_convergent: false,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Applies `mutate` to a clone of the state, reruns the solver, and
    /// either commits the solved result or reverts and reports
    /// non-convergence.
    fn apply_and_solve<F>(&mut self, mutate: F) -> Result<(), FacadeError>
    where
        F: FnOnce(&mut GridState),
    {
        let backup = self.state.clone();
        mutate(&mut self.state);
        match self.solver.solve(&mut self.state) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.state = backup;
                Err(err.into())
            }
        }
    }

    fn ensure_line_exists(&self, id: LineId) -> Result<(), FacadeError> {
        self.state.line(id).map(|_| ()).ok_or_else(|| FacadeError::ComponentNotFound(id.to_string()))
    }

    fn ensure_generator_exists(&self, id: GeneratorId) -> Result<(), FacadeError> {
        self.state
            .generator(id)
            .map(|_| ())
            .ok_or_else(|| FacadeError::ComponentNotFound(id.to_string()))
    }

    fn ensure_load_exists(&self, id: LoadId) -> Result<(), FacadeError> {
        self.state.load(id).map(|_| ()).ok_or_else(|| FacadeError::ComponentNotFound(id.to_string()))
    }

    fn ensure_shunt_exists(&self, id: ShuntId) -> Result<(), FacadeError> {
        self.state
            .shunt(id)
            .map(|_| ())
            .ok_or_else(|| FacadeError::ComponentNotFound(id.to_string()))
    }
}

/// Coarse severity classification for a voltage deviation.
fn severity_for_voltage(measured: f64, limit: f64) -> Severity {
    if (measured - limit).abs() / limit.max(f64::EPSILON) > 0.05 {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

/// Finds the zone owning a line, if any (tie-lines return `None`).
fn zone_of_line(state: &GridState, line: LineId) -> Option<crate::identifiers::ZoneId> {
    ZoneDescriptor::derive_all(state).into_iter().find(|d| d.lines.contains(&line)).map(|d| d.zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::ZoneId;

    #[test]
    fn snapshot_round_trip_preserves_observable_state() {
        let mut facade = SimulationFacade::with_canonical_case();
        let before = facade.state().clone();
        let outcome = facade.validate_action(|f| f.set_generator_output(GeneratorId(0), 70.0, 0.0));
        let _ = outcome;
        assert_eq!(facade.state(), &before);
    }

    #[test]
    fn validation_never_false_negatives_on_pre_existing_violations() {
        let mut facade = SimulationFacade::with_canonical_case();
        // Force a pre-existing, unrelated violation at bus 20 (zone3) by
        // injecting load directly (bypassing validation) so it is already
        // present going into the sandboxed check below.
        facade.inject_load_delta(BusId(20), 40.0).expect("injection should converge");
        let pre = facade.detect_violations();
        assert!(pre.iter().any(|v| v.component == "bus20"));

        // An unrelated action on zone1's generator should not be blocked by
        // the pre-existing zone3 violation.
        let outcome = facade.validate_action(|f| f.set_generator_output(GeneratorId(1), 45.0, 0.0));
        assert!(outcome.safe, "unrelated action must not be blocked by pre-existing violations");
    }

    #[test]
    fn escalating_an_unrelated_generator_does_not_touch_other_zones() {
        let facade = SimulationFacade::with_canonical_case();
        let zones = facade.zone_partitions();
        assert_eq!(zones.len(), 3);
        assert!(zones.iter().any(|z| z.zone == ZoneId::Zone1));
    }

    #[test]
    fn run_power_flow_is_idempotent_on_an_already_solved_state() {
        let mut facade = SimulationFacade::with_canonical_case();
        let before = facade.state().clone();
        facade.run_power_flow().expect("solve should converge");
        assert_eq!(facade.state(), &before);
    }

    #[test]
    fn trip_line_does_not_crash_cascade() {
        let mut facade = SimulationFacade::with_canonical_case();
        facade.trip_line(LineId(0)).expect("trip should converge");
        let violations = facade.detect_violations();
        let worst_thermal = violations
            .iter()
            .filter(|v| v.kind == ViolationKind::Thermal)
            .map(|v| v.measured)
            .fold(0.0_f64, f64::max);
        assert!(worst_thermal <= 120.0);
    }
}
