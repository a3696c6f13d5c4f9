// crates/grid-core/src/fixtures.rs
// ============================================================================
// Module: Canonical 30-Bus Case
// Description: Synthesizes the reference IEEE-30-bus-shaped network the
//              facade is constructed from at startup.
// Purpose: Give every crate a single, deterministic starting topology.
// Dependencies: crate::state, crate::identifiers, crate::solver
// ============================================================================

//! ## Overview
//! The topology is a three-zone ring (buses 0-9, 10-19, 20-29) joined by
//! three tie-lines, with one generator per ring at indices `{0, 5}` offset
//! within each zone and a baseline load at every bus. Shunt compensators are
//! synthesized on every bus, out of service by default, matching spec.md
//! §3's "shunt compensators are synthesized if absent".

use crate::identifiers::BusId;
use crate::identifiers::GeneratorId;
use crate::identifiers::LineId;
use crate::identifiers::LoadId;
use crate::identifiers::ShuntId;
use crate::identifiers::TransformerId;
use crate::solver::NOMINAL_FREQUENCY_HZ;
use crate::state::Bus;
use crate::state::Generator;
use crate::state::GridState;
use crate::state::Line;
use crate::state::Load;
use crate::state::Shunt;
use crate::state::Transformer;

/// Baseline per-bus load, MW.
const BASELINE_LOAD_MW: f64 = 5.0;
/// Generator capacity, MW.
const GENERATOR_CAPACITY_MW: f64 = 120.0;
/// Generator floor, MW.
const GENERATOR_FLOOR_MW: f64 = 0.0;
/// Reactive capacity, MVAr.
const GENERATOR_Q_CAPACITY_MVAR: f64 = 60.0;
/// Shunt rating, MVAr.
const SHUNT_RATING_MVAR: f64 = 10.0;
/// Line thermal limit, kilo-amps.
const LINE_THERMAL_LIMIT_KA: f64 = 5.0;

/// Builds the canonical 30-bus case: three 10-bus rings joined by three
/// tie-lines, two generators per zone, a baseline load on every bus, and a
/// synthesized (out-of-service) shunt on every bus.
#[must_use]
pub fn canonical_30_bus_case() -> GridState {
    let mut buses = Vec::with_capacity(30);
    for i in 0..30u8 {
        buses.push(Bus { id: BusId(i), vm_pu: 1.0 });
    }

    let mut lines = Vec::new();
    let mut line_idx = 0u8;
    for zone_start in [0u8, 10, 20] {
        for offset in 0..10u8 {
            let from = zone_start + offset;
            let to = zone_start + (offset + 1) % 10;
            lines.push(Line {
                id: LineId(line_idx),
                from_bus: BusId(from),
                to_bus: BusId(to),
                in_service: true,
                loading_percent: 0.0,
                current_ka: 0.0,
                thermal_limit_ka: LINE_THERMAL_LIMIT_KA,
            });
            line_idx += 1;
        }
    }
    let tie_lines = [(9u8, 10u8), (19, 20), (29, 0)];
    for (from, to) in tie_lines {
        lines.push(Line {
            id: LineId(line_idx),
            from_bus: BusId(from),
            to_bus: BusId(to),
            in_service: true,
            loading_percent: 0.0,
            current_ka: 0.0,
            thermal_limit_ka: LINE_THERMAL_LIMIT_KA,
        });
        line_idx += 1;
    }

    let mut generators = Vec::new();
    let mut gen_idx = 0u8;
    for zone_start in [0u8, 10, 20] {
        for offset in [0u8, 5] {
            generators.push(Generator {
                id: GeneratorId(gen_idx),
                bus: BusId(zone_start + offset),
                in_service: true,
                p_mw: 25.0,
                q_mvar: 0.0,
                max_p_mw: GENERATOR_CAPACITY_MW,
                min_p_mw: GENERATOR_FLOOR_MW,
                max_q_mvar: GENERATOR_Q_CAPACITY_MVAR,
                min_q_mvar: -GENERATOR_Q_CAPACITY_MVAR,
            });
            gen_idx += 1;
        }
    }

    let mut loads = Vec::with_capacity(30);
    for i in 0..30u8 {
        loads.push(Load { id: LoadId(i), bus: BusId(i), p_mw: BASELINE_LOAD_MW, q_mvar: 1.0 });
    }

    let mut shunts = Vec::with_capacity(30);
    for i in 0..30u8 {
        shunts.push(Shunt {
            id: ShuntId(i),
            bus: BusId(i),
            in_service: false,
            q_mvar_rated: SHUNT_RATING_MVAR,
        });
    }

    let transformers = tie_lines
        .iter()
        .enumerate()
        .map(|(i, _)| Transformer {
            id: TransformerId(i as u8),
            line: LineId(30 + i as u8),
            winding_temp_c: 40.0,
        })
        .collect();

    let mut state = GridState {
        buses,
        lines,
        generators,
        loads,
        shunts,
        transformers,
        frequency_hz: NOMINAL_FREQUENCY_HZ,
    };
    // Pre-seat a converged baseline so a freshly constructed facade observes
    // realistic voltages/loadings even before the first explicit solve.
    let _ = crate::solver::ReferenceSolver.solve(&mut state);
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_has_expected_shape() {
        let state = canonical_30_bus_case();
        assert_eq!(state.buses.len(), 30);
        assert_eq!(state.lines.len(), 33);
        assert_eq!(state.generators.len(), 6);
        assert_eq!(state.loads.len(), 30);
        assert_eq!(state.shunts.len(), 30);
        assert_eq!(state.transformers.len(), 3);
    }

    #[test]
    fn tie_lines_span_zone_boundaries() {
        let state = canonical_30_bus_case();
        let tie = &state.lines[30];
        assert_eq!(tie.from_bus, BusId(9));
        assert_eq!(tie.to_bus, BusId(10));
    }
}
