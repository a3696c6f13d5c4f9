// crates/grid-core/tests/scenarios.rs
// ============================================================================
// Integration tests for the end-to-end scenarios in spec.md §8 that are
// fully exercised at the facade level (line overload recovery, voltage
// collapse prevention, cascading failure prevention, snapshot atomicity).
// ============================================================================

use grid_core::BusId;
use grid_core::GeneratorId;
use grid_core::LineId;
use grid_core::SimulationFacade;
use grid_core::ViolationKind;

#[test]
fn line_overload_recovery_after_manual_balance() {
    let mut facade = SimulationFacade::with_canonical_case();
    facade.inject_load_delta(BusId(7), 50.0).expect("injection converges");

    let violations = facade.detect_violations();
    assert!(violations.iter().any(|v| v.kind == ViolationKind::Thermal));

    // Corrective action: scale the load at the overloaded line's receiving
    // bus down towards the 95%-of-limit target, mirroring grid-zone's
    // balance-loading behavior.
    let overloaded = violations
        .iter()
        .find(|v| v.kind == ViolationKind::Thermal)
        .expect("a thermal violation exists");
    let target = 95.0;
    let factor = target / overloaded.measured;
    let load_id = facade
        .state()
        .loads_at_bus(BusId(7))
        .next()
        .expect("bus7 has a load")
        .id;
    facade.scale_load(load_id, factor).expect("scaling converges");

    let max_loading = facade
        .state()
        .lines
        .iter()
        .map(|l| l.loading_percent)
        .fold(0.0_f64, f64::max);
    assert!(max_loading <= 100.0, "max loading {max_loading} exceeds 100%");
}

#[test]
fn voltage_collapse_prevention_via_shunt_activation() {
    let mut facade = SimulationFacade::with_canonical_case();
    for bus in [BusId(10), BusId(12), BusId(14), BusId(15)] {
        facade.inject_load_delta(bus, 20.0).expect("injection converges");
    }
    let pre = facade.detect_violations();
    assert!(pre.iter().any(|v| v.kind == ViolationKind::VoltageLow));

    // Activate every shunt on zone2's buses (10-19).
    let zone2_shunt_ids: Vec<_> = facade
        .state()
        .shunts
        .iter()
        .filter(|s| (10..20).contains(&s.bus.0))
        .map(|s| s.id)
        .collect();
    for shunt in zone2_shunt_ids {
        facade.set_shunt_status(shunt, true).expect("activation converges");
    }

    for bus in facade.state().buses.iter().filter(|b| (10..20).contains(&b.id.0)) {
        assert!(bus.vm_pu >= 0.95, "zone2 bus {} still under 0.95 ({})", bus.id, bus.vm_pu);
    }
}

#[test]
fn cascading_failure_prevention_on_line_trip() {
    let mut facade = SimulationFacade::with_canonical_case();
    facade.trip_line(LineId(0)).expect("trip converges");
    let violations = facade.detect_violations();
    let worst = violations
        .iter()
        .filter(|v| v.kind == ViolationKind::Thermal)
        .map(|v| v.measured)
        .fold(0.0_f64, f64::max);
    assert!(worst <= 120.0);
}

#[test]
fn snapshot_atomicity_does_not_leak_sandbox_mutations() {
    let mut facade = SimulationFacade::with_canonical_case();
    let idx = facade.save_snapshot();
    facade.set_generator_output(GeneratorId(0), 58.0, 0.0).expect("mutation converges");
    let expected_after_mutation = facade.state().generator(GeneratorId(0)).unwrap().p_mw;

    // An unrelated validation must not leak its own sandbox into the state
    // we just committed above.
    let _ = facade.validate_action(|f| f.set_generator_output(GeneratorId(1), 30.0, 0.0));
    assert_eq!(facade.state().generator(GeneratorId(0)).unwrap().p_mw, expected_after_mutation);

    facade.restore_snapshot(idx).expect("restore to pre-mutation state");
}
