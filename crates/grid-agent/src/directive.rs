// crates/grid-agent/src/directive.rs
// ============================================================================
// Module: Escalation Directive Synthesis
// Description: Builds the user-turn text the monitoring loop (C10) hands
//              the strategic agent when a zone's protection engine
//              escalates instead of correcting.
// Purpose: spec.md §4.9: enumerate real device ids (never let the model
//          invent one), summarize violation groups, and propose a
//          concrete first action so the model has somewhere to start.
// Dependencies: grid-core
// ============================================================================

use grid_core::GridState;
use grid_core::ViolationEvent;
use grid_core::ViolationKind;

/// MW step used when proposing a generator setpoint raise, clamped to the
/// generator's own `max_p_mw` by the caller once the model actually
/// invokes the tool.
const SETPOINT_RAISE_STEP_MW: f64 = 10.0;

/// The load scale factor proposed for an overloaded line's first
/// corrective action.
const LOAD_SCALE_PROPOSAL: f64 = 0.8;

/// Builds the directive text for an escalation: the violations that
/// local zone rules could not resolve, plus the real device ids and a
/// concrete proposed first action.
#[must_use]
pub fn build_escalation_directive(state: &GridState, violations: &[ViolationEvent]) -> String {
    let low_voltage: Vec<&ViolationEvent> =
        violations.iter().filter(|v| v.kind == ViolationKind::VoltageLow).collect();
    let high_voltage: Vec<&ViolationEvent> =
        violations.iter().filter(|v| v.kind == ViolationKind::VoltageHigh).collect();
    let thermal: Vec<&ViolationEvent> = violations.iter().filter(|v| v.kind == ViolationKind::Thermal).collect();
    let frequency: Vec<&ViolationEvent> =
        violations.iter().filter(|v| v.kind == ViolationKind::Frequency).collect();

    let mut sections = Vec::new();
    sections.push(
        "Zone protection escalated; local corrective rules could not resolve the following \
         violations within the allowed cycles. Decide on and execute an immediate first \
         action using the tools available to you."
            .to_string(),
    );

    if !low_voltage.is_empty() {
        sections.push(format!(
            "Low-voltage buses: {}. {}",
            describe_violations(&low_voltage),
            propose_for_low_voltage(state)
        ));
    }
    if !high_voltage.is_empty() {
        sections.push(format!("Over-voltage buses: {}.", describe_violations(&high_voltage)));
    }
    if !thermal.is_empty() {
        sections.push(format!(
            "Overloaded lines: {}. {}",
            describe_violations(&thermal),
            propose_for_thermal(state, &thermal)
        ));
    }
    if !frequency.is_empty() {
        sections.push(format!("System frequency deviation: {}.", describe_violations(&frequency)));
    }

    sections.join("\n")
}

fn describe_violations(violations: &[&ViolationEvent]) -> String {
    violations
        .iter()
        .map(|v| format!("{} (measured {:.3}, limit {:.3})", v.component, v.measured, v.limit))
        .collect::<Vec<_>>()
        .join(", ")
}

fn propose_for_low_voltage(state: &GridState) -> String {
    let mut actions = Vec::new();
    if let Some(generator) = state.generators.iter().find(|g| g.in_service) {
        actions.push(format!(
            "Raise generator {}'s setpoint by {SETPOINT_RAISE_STEP_MW} MW (clamped to its max of {} MW).",
            generator.id, generator.max_p_mw
        ));
    }
    let idle_shunts: Vec<String> = state.shunts.iter().filter(|s| !s.in_service).map(|s| s.id.to_string()).collect();
    if !idle_shunts.is_empty() {
        actions.push(format!("Activate capacitor bank(s) {}.", idle_shunts.join(", ")));
    }
    if actions.is_empty() {
        "No idle generator or shunt capacity is available; consider load shedding.".to_string()
    } else {
        format!("Proposed first action: {}", actions.join(" "))
    }
}

fn propose_for_thermal(state: &GridState, thermal: &[&ViolationEvent]) -> String {
    let Some(first) = thermal.first() else { return String::new() };
    let Some(line) = state.lines.iter().find(|l| l.id.to_string() == first.component) else {
        return String::new();
    };
    let downstream_loads: Vec<String> =
        state.loads_at_bus(line.to_bus).map(|l| l.id.to_string()).collect();
    if downstream_loads.is_empty() {
        return String::new();
    }
    format!(
        "Proposed first action: scale load(s) {} to {LOAD_SCALE_PROPOSAL} of their current value to relieve line {}.",
        downstream_loads.join(", "),
        line.id
    )
}

#[cfg(test)]
mod tests {
    use grid_core::SimulationFacade;
    use grid_core::Severity;
    use grid_core::Timestamp;
    use grid_core::ZoneId;

    use super::*;

    fn violation(kind: ViolationKind, component: &str) -> ViolationEvent {
        ViolationEvent {
            kind,
            zone: Some(ZoneId::Zone1),
            severity: Severity::Critical,
            component: component.to_string(),
            measured: 0.9,
            limit: 0.95,
            at: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn low_voltage_directive_names_a_real_generator_and_its_max() {
        let facade = SimulationFacade::with_canonical_case();
        let violations = vec![violation(ViolationKind::VoltageLow, "bus3")];
        let directive = build_escalation_directive(facade.state(), &violations);
        assert!(directive.contains("Low-voltage buses"));
        assert!(directive.contains("Raise generator"));
    }

    #[test]
    fn thermal_directive_references_a_line_present_in_state() {
        let facade = SimulationFacade::with_canonical_case();
        let line_id = facade.state().lines.first().unwrap().id.to_string();
        let violations = vec![violation(ViolationKind::Thermal, &line_id)];
        let directive = build_escalation_directive(facade.state(), &violations);
        assert!(directive.contains("Overloaded lines"));
    }

    #[test]
    fn empty_violations_yields_only_the_header_section() {
        let facade = SimulationFacade::with_canonical_case();
        let directive = build_escalation_directive(facade.state(), &[]);
        assert!(directive.contains("Zone protection escalated"));
    }
}
