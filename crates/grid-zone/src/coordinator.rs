// crates/grid-zone/src/coordinator.rs
// ============================================================================
// Module: Zone Coordinator Endpoint
// Description: Wraps a `ZoneEngine` behind `grid_registry::Endpoint`, giving
//              the dispatcher (C6) and the strategic agent (C9) the same
//              tool-call surface every sensor and actuator endpoint uses.
// Dependencies: grid-core, grid-contract, grid-registry, crate::engine
// ============================================================================

use grid_contract::SafetyClass;
use grid_contract::ToolDescriptor;
use grid_contract::ToolName;
use grid_core::ZoneDescriptor;
use grid_registry::Endpoint;
use grid_registry::RegistryError;

use crate::engine::ZoneEngine;
use crate::optimizer;
use crate::report::CorrectiveAction;

/// The zone coordinator's published tool surface (spec.md §4.7).
pub struct ZoneCoordinator {
    engine: ZoneEngine,
}

impl ZoneCoordinator {
    /// Wraps `engine` as an endpoint.
    #[must_use]
    pub const fn new(engine: ZoneEngine) -> Self {
        Self { engine }
    }

    /// The wrapped engine, for callers (e.g. the monitoring loop) that need
    /// direct access rather than going through `Endpoint::invoke`.
    #[must_use]
    pub const fn engine(&self) -> &ZoneEngine {
        &self.engine
    }
}

impl Endpoint for ZoneCoordinator {
    fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor {
                name: ToolName::from("get_zone_status"),
                description: format!("Reads {}'s current state, thresholds, and deadband counter.", self.engine.zone()),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
            ToolDescriptor {
                name: ToolName::from("detect_violations"),
                description: "Runs the zone's detection sweep without advancing the deadband.".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
            ToolDescriptor {
                name: ToolName::from("execute_safety_rules"),
                description: "Runs one protection evaluation cycle: detect, correct or escalate.".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::LowRisk,
            },
            ToolDescriptor {
                name: ToolName::from("optimize_zone_topology"),
                description: "Minimizes total system losses by perturbing this zone's generator setpoints.".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::MediumRisk,
            },
            ToolDescriptor {
                name: ToolName::from("voltage_regulation"),
                description: "Switches shunts to correct an owned bus's voltage deviation.".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::MediumRisk,
            },
            ToolDescriptor {
                name: ToolName::from("load_balancing"),
                description: "Scales loads downstream of an overloaded owned line toward a target loading percent.".to_string(),
                input_schema: serde_json::json!({"type": "object", "properties": {"target_percent": {"type": "number"}}}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::MediumRisk,
            },
            ToolDescriptor {
                name: ToolName::from("handle_violation"),
                description: "Applies the appropriate local optimizer for one violation's kind.".to_string(),
                input_schema: serde_json::json!({"type": "object", "properties": {"kind": {"type": "string"}}}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::MediumRisk,
            },
            ToolDescriptor {
                name: ToolName::from("emergency_islanding"),
                description: "Opens every tie-line with exactly one endpoint in this zone.".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::Emergency,
            },
            ToolDescriptor {
                name: ToolName::from("update_protection_settings"),
                description: "Overrides this zone's protection thresholds.".to_string(),
                input_schema: serde_json::json!({"type": "object", "properties": {"under_voltage_pu": {"type": "number"}, "over_voltage_pu": {"type": "number"}, "max_line_loading_percent": {"type": "number"}, "frequency_band_hz": {"type": "number"}}}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::LowRisk,
            },
        ]
    }

    fn invoke(&self, tool_name: &str, arguments: serde_json::Value) -> Result<serde_json::Value, RegistryError> {
        match tool_name {
            "get_zone_status" => Ok(serde_json::json!({
                "zone": self.engine.zone().to_string(),
                "state": self.engine.state(),
                "consecutive_violation_cycles": self.engine.consecutive_violation_cycles(),
                "thresholds": self.engine.thresholds(),
            })),
            "detect_violations" => {
                let violations = self.engine.detect();
                Ok(serde_json::json!({"violations": violations, "count": violations.len()}))
            }
            "execute_safety_rules" => {
                let outcome = self.engine.execute_safety_rules();
                serde_json::to_value(outcome).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            "optimize_zone_topology" => {
                let mut facade = self.lock_facade();
                let descriptor = ZoneDescriptor::derive(facade.state(), self.engine.zone());
                let report = optimizer::minimize_losses(&mut facade, &descriptor);
                serde_json::to_value(report).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            "voltage_regulation" => {
                let mut facade = self.lock_facade();
                let descriptor = ZoneDescriptor::derive(facade.state(), self.engine.zone());
                let report = optimizer::regulate_voltage(&mut facade, &descriptor, self.engine.thresholds());
                serde_json::to_value(report).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            "load_balancing" => {
                let target = arguments
                    .get("target_percent")
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or(self.engine.thresholds().max_line_loading_percent * 0.95);
                let mut facade = self.lock_facade();
                let descriptor = ZoneDescriptor::derive(facade.state(), self.engine.zone());
                let report = optimizer::balance_loading(&mut facade, &descriptor, target);
                serde_json::to_value(report).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            "handle_violation" => {
                let kind = arguments.get("kind").and_then(serde_json::Value::as_str).unwrap_or("");
                let mut facade = self.lock_facade();
                let descriptor = ZoneDescriptor::derive(facade.state(), self.engine.zone());
                let action = match kind {
                    "voltage_low" | "voltage_high" => CorrectiveAction::VoltageRegulated(optimizer::regulate_voltage(
                        &mut facade,
                        &descriptor,
                        self.engine.thresholds(),
                    )),
                    "thermal" => CorrectiveAction::LoadBalanced(optimizer::balance_loading(
                        &mut facade,
                        &descriptor,
                        self.engine.thresholds().max_line_loading_percent * 0.95,
                    )),
                    other => return Err(RegistryError::InvalidAction { kind: "zone_coordinator".to_string(), action: other.to_string() }),
                };
                serde_json::to_value(action).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            "emergency_islanding" => {
                let report = self.engine.emergency_islanding()?;
                serde_json::to_value(report).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            "update_protection_settings" => {
                let mut thresholds = self.engine.thresholds();
                if let Some(v) = arguments.get("under_voltage_pu").and_then(serde_json::Value::as_f64) {
                    thresholds.under_voltage_pu = v;
                }
                if let Some(v) = arguments.get("over_voltage_pu").and_then(serde_json::Value::as_f64) {
                    thresholds.over_voltage_pu = v;
                }
                if let Some(v) = arguments.get("max_line_loading_percent").and_then(serde_json::Value::as_f64) {
                    thresholds.max_line_loading_percent = v;
                }
                if let Some(v) = arguments.get("frequency_band_hz").and_then(serde_json::Value::as_f64) {
                    thresholds.frequency_band_hz = v;
                }
                self.engine.update_protection_settings(thresholds);
                Ok(serde_json::json!({"thresholds": thresholds}))
            }
            other => Err(RegistryError::UnknownTool(other.to_string())),
        }
    }
}

impl ZoneCoordinator {
    fn lock_facade(&self) -> std::sync::MutexGuard<'_, grid_core::SimulationFacade> {
        // `ZoneEngine` keeps its facade handle private; the coordinator needs
        // direct lock access for optimizer calls that don't go through
        // `execute_safety_rules`. Exposed narrowly via this crate-visible
        // accessor rather than making the field public.
        self.engine.lock_facade_for_coordinator()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use grid_core::telemetry::NoopMetrics;
    use grid_core::SimulationFacade;
    use grid_core::ZoneId;
    use grid_bus::EventBus;
    use grid_store::AuditLog;

    use super::*;

    fn coordinator() -> ZoneCoordinator {
        let facade = Arc::new(StdMutex::new(SimulationFacade::with_canonical_case()));
        let bus = Arc::new(EventBus::new());
        let audit = Arc::new(AuditLog::open_in_memory().expect("open"));
        ZoneCoordinator::new(ZoneEngine::new(ZoneId::Zone2, facade, bus, audit, Arc::new(NoopMetrics)))
    }

    #[test]
    fn advertises_nine_tools() {
        let coordinator = coordinator();
        assert_eq!(coordinator.tool_descriptors().len(), 9);
    }

    #[test]
    fn get_zone_status_reports_normal_on_a_clean_grid() {
        let coordinator = coordinator();
        let status = coordinator.invoke("get_zone_status", serde_json::json!({})).expect("invoke");
        assert_eq!(status["state"], serde_json::json!("normal"));
    }

    #[test]
    fn unknown_tool_is_a_structured_error() {
        let coordinator = coordinator();
        let result = coordinator.invoke("nonexistent", serde_json::json!({}));
        assert!(matches!(result, Err(RegistryError::UnknownTool(_))));
    }

    #[test]
    fn handle_violation_rejects_unknown_kind() {
        let coordinator = coordinator();
        let result = coordinator.invoke("handle_violation", serde_json::json!({"kind": "bogus"}));
        assert!(matches!(result, Err(RegistryError::InvalidAction { .. })));
    }
}
