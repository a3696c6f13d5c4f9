// crates/grid-core/src/solver.rs
// ============================================================================
// Module: Power Flow Solver Contract
// Description: The trait boundary to the external numerical power-flow
//              library, plus a deterministic reference implementation used
//              where no real solver is wired in (tests, local development).
// Purpose: Keep the facade's mutation/revert logic independent of whichever
//          numerical backend computes node voltages.
// Dependencies: crate::state
// ============================================================================

//! ## Overview
//! Correctness of the electrical physics is explicitly out of scope (see
//! `spec.md` §1 Non-goals). [`PowerFlowSolver`] is the seam: a production
//! deployment plugs in a real numerical library; [`ReferenceSolver`] is a
//! small, deterministic surrogate good enough to drive the control-plane
//! logic (detection, escalation, sandboxing) in tests and demos.

use thiserror::Error;

use crate::state::GridState;

/// Errors reported by a power-flow solve attempt.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    /// The solver could not find a steady-state solution.
    #[error("power flow did not converge: {reason}")]
    NonConvergent {
        /// Human-readable non-convergence reason.
        reason: String,
    },
}

/// Backend-agnostic power-flow solver.
///
/// # Invariants
/// - `solve` either mutates `state` into a converged steady state and
///   returns `Ok(())`, or leaves `state` untouched and returns `Err`. It
///   never returns `Ok` for a state the caller should not observe.
pub trait PowerFlowSolver {
    /// Solves for a steady state given current generation, load, and
    /// topology, mutating `state` in place.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::NonConvergent`] when no steady state is found
    /// (e.g. generation cannot cover load within unit limits).
    fn solve(&self, state: &mut GridState) -> Result<(), SolveError>;
}

/// Nominal system frequency, Hz.
pub const NOMINAL_FREQUENCY_HZ: f64 = 60.0;
/// Droop coefficient relating generation/load imbalance to frequency
/// deviation.
const DROOP_COEFFICIENT: f64 = 2.0;
/// Fixed fractional loss assumption applied to total load.
const LOSS_FRACTION: f64 = 0.02;
/// Voltage sensitivity to local per-bus net demand, per-unit per MW.
const VOLTAGE_SENSITIVITY: f64 = 0.004;
/// Baseline per-line loading percent before local bus net demand is added.
const BASE_LINE_LOADING_PERCENT: f64 = 10.0;
/// Line loading sensitivity to local bus net demand, percent per MW.
const LINE_LOADING_SENSITIVITY: f64 = 1.8;
/// Ambient transformer temperature, degrees Celsius.
const AMBIENT_TEMP_C: f64 = 40.0;
/// Transformer temperature rise per percent loading, degrees Celsius.
const TEMP_RISE_PER_LOADING_PERCENT: f64 = 0.5;
/// Equivalent MW support credited per MVAr of in-service shunt rating.
const SHUNT_SUPPORT_FACTOR: f64 = 1.0;

/// A small, deterministic surrogate power-flow model.
///
/// Not a claim of electrical correctness: it exists so the control plane has
/// something to drive detection, sandboxing, and escalation logic against
/// without a real numerical dependency.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceSolver;

impl ReferenceSolver {
    /// Net local demand at a bus: load minus in-service shunt support,
    /// minus any non-slack generation sited there.
    fn net_local_mw(state: &GridState, bus: crate::identifiers::BusId) -> f64 {
        let load: f64 = state.loads_at_bus(bus).map(|l| l.p_mw).sum();
        let shunt_support: f64 = state
            .shunts_at_bus(bus)
            .filter(|s| s.in_service)
            .map(|s| s.q_mvar_rated * SHUNT_SUPPORT_FACTOR)
            .sum();
        load - shunt_support
    }
}

impl PowerFlowSolver for ReferenceSolver {
    fn solve(&self, state: &mut GridState) -> Result<(), SolveError> {
        let total_load: f64 = state.total_load_mw();
        let assumed_losses = total_load * LOSS_FRACTION;
        let required_total_gen = total_load + assumed_losses;

        let in_service_gen_ids: Vec<_> =
            state.generators.iter().filter(|g| g.in_service).map(|g| g.id).collect();
        let Some((&slack_id, other_ids)) = in_service_gen_ids.split_first() else {
            return Err(SolveError::NonConvergent {
                reason: "no in-service generators".to_string(),
            });
        };

        let others_total: f64 = other_ids
            .iter()
            .filter_map(|id| state.generator(*id))
            .map(|g| g.p_mw)
            .sum();
        let slack_target = required_total_gen - others_total;

        let (slack_min, slack_max) = {
            let slack = state
                .generator(slack_id)
                .ok_or_else(|| SolveError::NonConvergent {
                    reason: "slack generator missing".to_string(),
                })?;
            (slack.min_p_mw, slack.max_p_mw)
        };
        if slack_target < slack_min - 1e-6 || slack_target > slack_max + 1e-6 {
            return Err(SolveError::NonConvergent {
                reason: format!(
                    "slack generator setpoint {slack_target:.2} MW outside [{slack_min:.2}, {slack_max:.2}]"
                ),
            });
        }
        if let Some(slack) = state.generator_mut(slack_id) {
            slack.p_mw = slack_target.clamp(slack_min, slack_max);
        }

        let actual_gen = state.total_generation_mw();
        let imbalance = (actual_gen - total_load - assumed_losses) / total_load.max(1.0);
        state.frequency_hz = NOMINAL_FREQUENCY_HZ + DROOP_COEFFICIENT * imbalance;

        for bus in &mut state.buses {
            let net = Self::net_local_mw(state, bus.id);
            bus.vm_pu = 1.02 - VOLTAGE_SENSITIVITY * net;
        }

        for line in &mut state.lines {
            if !line.in_service {
                line.loading_percent = 0.0;
                line.current_ka = 0.0;
                continue;
            }
            let net = Self::net_local_mw(state, line.to_bus);
            let loading = (BASE_LINE_LOADING_PERCENT + LINE_LOADING_SENSITIVITY * net).max(0.0);
            line.loading_percent = loading;
            line.current_ka = loading / 100.0 * line.thermal_limit_ka;
        }

        for xfmr in &mut state.transformers {
            let loading = state.line(xfmr.line).map(|l| l.loading_percent).unwrap_or(0.0);
            xfmr.winding_temp_c = AMBIENT_TEMP_C + TEMP_RISE_PER_LOADING_PERCENT * loading;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::canonical_30_bus_case;

    #[test]
    fn reference_solver_converges_on_clean_case() {
        let mut state = canonical_30_bus_case();
        ReferenceSolver.solve(&mut state).expect("clean case converges");
        assert!((state.total_generation_mw() - (state.total_load_mw() + state.total_losses_mw())).abs() < 1.0);
    }

    #[test]
    fn heavy_injected_load_raises_line_loading() {
        let mut state = canonical_30_bus_case();
        ReferenceSolver.solve(&mut state).expect("baseline converges");
        let baseline = state.lines[6].loading_percent;

        let bus7 = crate::identifiers::BusId(7);
        if let Some(load) = state.loads.iter_mut().find(|l| l.bus == bus7) {
            load.p_mw += 50.0;
        }
        ReferenceSolver.solve(&mut state).expect("loaded case converges");
        let loaded = state
            .lines
            .iter()
            .find(|l| l.to_bus == bus7)
            .expect("a line terminates at bus7")
            .loading_percent;
        assert!(loaded > baseline);
        assert!(loaded > 100.0, "expected overload, got {loaded}");
    }
}
