// crates/grid-zone/src/optimizer.rs
// ============================================================================
// Module: Zone Optimizer Capabilities
// Description: Three deterministic corrective capabilities a zone engine can
//              apply against its own facade: minimize losses, regulate
//              voltage, balance line loading.
// Purpose: Give `ZoneEngine` small, independently testable units of
//          corrective behavior instead of one large rule function.
// Dependencies: grid-core
// ============================================================================

//! ## Overview
//! Every function here takes an already-locked `&mut SimulationFacade` and a
//! zone descriptor, and commits its changes directly (no sandboxing): these
//! are the zone's *own* corrective moves, not a third party's proposed
//! action, so there is nothing to validate against before committing.

use grid_core::ProtectionThresholds;
use grid_core::SimulationFacade;
use grid_core::ZoneDescriptor;

use crate::report::GeneratorAdjustment;
use crate::report::LoadAdjustment;
use crate::report::LoadBalancingReport;
use crate::report::LossMinimizationReport;
use crate::report::ShuntChange;
use crate::report::VoltageRegulationReport;

/// Candidate active-power perturbations tried per generator, MW.
const PERTURBATIONS_MW: [f64; 4] = [-5.0, -2.0, 2.0, 5.0];

/// For each generator the zone owns, tries each of [`PERTURBATIONS_MW`]
/// (clamped to the generator's limits), keeping whichever setpoint yields
/// the lowest total system losses after a converged solve.
pub fn minimize_losses(facade: &mut SimulationFacade, descriptor: &ZoneDescriptor) -> LossMinimizationReport {
    let before_losses_mw = facade.state().total_losses_mw();
    let generator_ids: Vec<_> = facade
        .state()
        .generators
        .iter()
        .filter(|g| descriptor.buses.contains(&g.bus))
        .map(|g| g.id)
        .collect();

    let mut adjustments = Vec::new();
    for generator_id in generator_ids {
        let Some(generator) = facade.state().generator(generator_id) else { continue };
        let (orig_p, orig_q, min_p, max_p) =
            (generator.p_mw, generator.q_mvar, generator.min_p_mw, generator.max_p_mw);

        let mut best_p = orig_p;
        let mut best_losses = facade.state().total_losses_mw();
        for delta in PERTURBATIONS_MW {
            let candidate = (orig_p + delta).clamp(min_p, max_p);
            if (candidate - orig_p).abs() < f64::EPSILON {
                continue;
            }
            let snapshot = facade.save_snapshot();
            if facade.set_generator_output(generator_id, candidate, orig_q).is_ok() {
                let candidate_losses = facade.state().total_losses_mw();
                if candidate_losses < best_losses {
                    best_losses = candidate_losses;
                    best_p = candidate;
                }
            }
            let _ = facade.restore_snapshot(snapshot);
        }

        if (best_p - orig_p).abs() > f64::EPSILON {
            // Recompute against the post-restore state: earlier perturbations on
            // sibling generators in this loop may have shifted the baseline.
            if facade.set_generator_output(generator_id, best_p, orig_q).is_ok() {
                adjustments.push(GeneratorAdjustment { generator: generator_id, from_mw: orig_p, to_mw: best_p });
            }
        }
    }

    LossMinimizationReport { before_losses_mw, after_losses_mw: facade.state().total_losses_mw(), adjustments }
}

/// If any owned bus is below `thresholds.under_voltage_pu`, switches in
/// every not-yet-in-service owned shunt. Else if any is above
/// `thresholds.over_voltage_pu`, switches out every currently active owned
/// shunt. Reports the final voltages and any violations that remain.
pub fn regulate_voltage(
    facade: &mut SimulationFacade,
    descriptor: &ZoneDescriptor,
    thresholds: ProtectionThresholds,
) -> VoltageRegulationReport {
    let under = descriptor.buses.iter().any(|&bus| {
        facade.state().bus(bus).is_some_and(|b| b.vm_pu < thresholds.under_voltage_pu)
    });
    let over = descriptor.buses.iter().any(|&bus| {
        facade.state().bus(bus).is_some_and(|b| b.vm_pu > thresholds.over_voltage_pu)
    });

    let mut shunt_changes = Vec::new();
    if under {
        let candidates: Vec<_> = facade
            .state()
            .shunts
            .iter()
            .filter(|s| descriptor.buses.contains(&s.bus) && !s.in_service)
            .map(|s| s.id)
            .collect();
        for shunt in candidates {
            if facade.set_shunt_status(shunt, true).is_ok() {
                shunt_changes.push(ShuntChange { shunt, now_in_service: true });
            }
        }
    } else if over {
        let candidates: Vec<_> = facade
            .state()
            .shunts
            .iter()
            .filter(|s| descriptor.buses.contains(&s.bus) && s.in_service)
            .map(|s| s.id)
            .collect();
        for shunt in candidates {
            if facade.set_shunt_status(shunt, false).is_ok() {
                shunt_changes.push(ShuntChange { shunt, now_in_service: false });
            }
        }
    }

    let final_voltages =
        descriptor.buses.iter().filter_map(|&bus| facade.state().bus(bus).map(|b| (bus, b.vm_pu))).collect();
    let remaining_violations = facade
        .detect_violations_with(thresholds)
        .into_iter()
        .filter(|v| v.zone == Some(descriptor.zone))
        .collect();

    VoltageRegulationReport { shunt_changes, final_voltages, remaining_violations }
}

/// For each owned line above `target_percent`, scales every load at its
/// receiving bus down by `target_percent / current_loading`.
pub fn balance_loading(
    facade: &mut SimulationFacade,
    descriptor: &ZoneDescriptor,
    target_percent: f64,
) -> LoadBalancingReport {
    let overloaded: Vec<_> = descriptor
        .lines
        .iter()
        .filter_map(|&line_id| {
            facade
                .state()
                .line(line_id)
                .filter(|line| line.loading_percent > target_percent)
                .map(|line| (line_id, line.to_bus, line.loading_percent))
        })
        .collect();

    let mut adjustments = Vec::new();
    for (line_id, to_bus, current_loading) in overloaded {
        if current_loading <= 0.0 {
            continue;
        }
        let factor = (target_percent / current_loading).clamp(0.0, 1.0);
        let load_ids: Vec<_> = facade.state().loads_at_bus(to_bus).map(|l| l.id).collect();
        for load_id in load_ids {
            if facade.scale_load(load_id, factor).is_ok() {
                adjustments.push(LoadAdjustment { line: line_id, load: load_id, factor });
            }
        }
    }

    LoadBalancingReport { adjustments }
}

#[cfg(test)]
mod tests {
    use grid_core::SimulationFacade;
    use grid_core::ZoneId;

    use super::*;

    #[test]
    fn minimize_losses_never_worsens_total_losses() {
        let mut facade = SimulationFacade::with_canonical_case();
        let descriptor = ZoneDescriptor::derive(facade.state(), ZoneId::Zone1);
        let before = facade.state().total_losses_mw();
        let report = minimize_losses(&mut facade, &descriptor);
        assert!(report.after_losses_mw <= before + 1e-9);
    }

    #[test]
    fn regulate_voltage_is_a_no_op_when_all_buses_are_nominal() {
        let mut facade = SimulationFacade::with_canonical_case();
        let descriptor = ZoneDescriptor::derive(facade.state(), ZoneId::Zone1);
        let report = regulate_voltage(&mut facade, &descriptor, facade.thresholds());
        assert!(report.shunt_changes.is_empty());
    }

    #[test]
    fn balance_loading_skips_lines_already_under_target() {
        let mut facade = SimulationFacade::with_canonical_case();
        let descriptor = ZoneDescriptor::derive(facade.state(), ZoneId::Zone1);
        let report = balance_loading(&mut facade, &descriptor, 1_000.0);
        assert!(report.adjustments.is_empty());
    }
}
