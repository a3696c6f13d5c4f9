// crates/grid-registry/src/actuator.rs
// ============================================================================
// Module: Actuator Endpoint (C5)
// Description: Controllable devices — circuit breakers, generators, load
//              controllers, voltage regulators, energy storage — each with
//              a fixed valid-action set and alias normalization.
// Purpose: Give every device kind the same control/status/list/shutdown
//          surface, gated by C1's sandbox before any real mutation commits.
// Dependencies: grid-core, grid-contract
// ============================================================================

//! ## Overview
//! `control` defaults to validating in a sandbox first: [`SimulationFacade::validate_action`]
//! runs the mutation, measures the violation delta, and always rolls it
//! back. Only when that sandbox run reports `safe` does `control` apply
//! the mutation for real. Energy storage additionally tracks state of
//! charge outside the facade, since SoC has no place in `GridState`.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;

use grid_contract::ActuatorResponse;
use grid_contract::AttributeBag;
use grid_contract::SafetyClass;
use grid_contract::ToolDescriptor;
use grid_contract::ToolName;
use grid_core::BusId;
use grid_core::FacadeError;
use grid_core::GeneratorId;
use grid_core::LineId;
use grid_core::LoadId;
use grid_core::ShuntId;
use grid_core::SimulationFacade;
use grid_core::ZoneDescriptor;
use grid_core::ZoneId;

use crate::endpoint::arg_f64;
use crate::endpoint::arg_str;
use crate::endpoint::lock_facade;
use crate::endpoint::Endpoint;
use crate::endpoint::SharedFacade;
use crate::error::RegistryError;

/// Minimum state of charge (fraction) energy storage may discharge below.
pub const MIN_DISCHARGE_SOC: f64 = 0.05;

/// The controllable device kind an [`Actuator`] owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorKind {
    CircuitBreaker,
    Generator,
    LoadController,
    VoltageRegulator,
    EnergyStorage,
}

impl ActuatorKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CircuitBreaker => "circuit_breaker",
            Self::Generator => "generator",
            Self::LoadController => "load_controller",
            Self::VoltageRegulator => "voltage_regulator",
            Self::EnergyStorage => "energy_storage",
        }
    }

    #[must_use]
    pub const fn valid_actions(self) -> &'static [&'static str] {
        match self {
            Self::CircuitBreaker => &["open", "close", "emergency_stop"],
            Self::Generator => &["set_output", "ramp", "emergency_stop"],
            Self::LoadController => &["scale", "shed", "restore", "emergency_stop"],
            Self::VoltageRegulator => &["activate", "deactivate", "emergency_stop"],
            Self::EnergyStorage => &["charge", "discharge", "stop", "emergency_stop"],
        }
    }

    fn normalize_action<'a>(self, action: &'a str) -> &'a str {
        match self {
            Self::VoltageRegulator => match action {
                "turn_on" | "enable" => "activate",
                "turn_off" | "disable" => "deactivate",
                other => other,
            },
            Self::CircuitBreaker => match action {
                "trip" => "open",
                "reclose" => "close",
                other => other,
            },
            _ => action,
        }
    }
}

/// A controllable device endpoint of one [`ActuatorKind`], owning every
/// device of that kind within its zone.
pub struct Actuator {
    kind: ActuatorKind,
    zone: ZoneId,
    facade: SharedFacade,
    soc: Mutex<HashMap<String, f64>>,
}

impl Actuator {
    /// Builds an actuator endpoint of `kind` over `zone`.
    #[must_use]
    pub fn new(kind: ActuatorKind, zone: ZoneId, facade: SharedFacade) -> Self {
        Self { kind, zone, facade, soc: Mutex::new(HashMap::new()) }
    }

    /// Ids this actuator currently owns.
    #[must_use]
    pub fn list_devices(&self) -> Vec<String> {
        let facade = lock_facade(&self.facade);
        let descriptor = ZoneDescriptor::derive(facade.state(), self.zone);
        match self.kind {
            ActuatorKind::CircuitBreaker => descriptor.lines.iter().map(ToString::to_string).collect(),
            ActuatorKind::Generator => facade
                .state()
                .generators
                .iter()
                .filter(|g| descriptor.buses.contains(&g.bus))
                .map(|g| g.id.to_string())
                .collect(),
            ActuatorKind::LoadController => facade
                .state()
                .loads
                .iter()
                .filter(|l| descriptor.buses.contains(&l.bus))
                .map(|l| l.id.to_string())
                .collect(),
            ActuatorKind::VoltageRegulator => facade
                .state()
                .shunts
                .iter()
                .filter(|s| descriptor.buses.contains(&s.bus))
                .map(|s| s.id.to_string())
                .collect(),
            ActuatorKind::EnergyStorage => facade
                .state()
                .generators
                .iter()
                .filter(|g| descriptor.buses.contains(&g.bus))
                .map(|g| format!("ess{}", g.id.0))
                .collect(),
        }
    }

    /// Validates (when `validate` is true) then applies `action` with
    /// `parameters` to device `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidAction`] if `action` is not in this
    /// kind's fixed action set, [`RegistryError::UnknownDevice`] if `id`
    /// does not exist, or wraps a [`FacadeError`] on non-convergence.
    pub fn control(
        &self,
        id: &str,
        action: &str,
        parameters: &serde_json::Value,
        validate: bool,
    ) -> Result<ActuatorResponse, RegistryError> {
        let normalized = self.kind.normalize_action(action);
        if !self.kind.valid_actions().contains(&normalized) {
            return Err(RegistryError::InvalidAction { kind: self.kind.label().to_string(), action: action.to_string() });
        }

        let previous_state = self.device_state(id)?;

        if self.kind == ActuatorKind::EnergyStorage {
            self.check_discharge_soc(id, normalized, parameters)?;
        }

        if validate {
            let mut facade = lock_facade(&self.facade);
            let outcome = facade.validate_action(|f| apply_action(f, self.kind, id, normalized, parameters));
            if !outcome.safe {
                return Ok(ActuatorResponse::rejected(
                    if outcome.non_convergent {
                        "action did not converge".to_string()
                    } else {
                        "action would introduce or worsen a violation".to_string()
                    },
                    previous_state,
                ));
            }
        }

        {
            let mut facade = lock_facade(&self.facade);
            apply_action(&mut facade, self.kind, id, normalized, parameters)?;
        }
        if self.kind == ActuatorKind::EnergyStorage {
            self.apply_soc(id, normalized, parameters);
        }

        let new_state = self.device_state(id)?;
        Ok(ActuatorResponse { validated: true, success: true, message: format!("{normalized} applied to {id}"), previous_state, new_state })
    }

    /// Applies `emergency_stop` to every device this actuator owns.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] encountered, if any.
    pub fn emergency_shutdown(&self) -> Result<Vec<ActuatorResponse>, RegistryError> {
        self.list_devices()
            .iter()
            .map(|id| self.control(id, "emergency_stop", &serde_json::json!({}), false))
            .collect()
    }

    fn device_state(&self, id: &str) -> Result<AttributeBag, RegistryError> {
        let facade = lock_facade(&self.facade);
        let mut bag = AttributeBag::new();
        match self.kind {
            ActuatorKind::CircuitBreaker => {
                let line = facade.state().line(parse_line(id)?).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))?;
                bag.insert("in_service".to_string(), serde_json::json!(line.in_service));
                bag.insert("loading_percent".to_string(), serde_json::json!(line.loading_percent));
            }
            ActuatorKind::Generator => {
                let gen = facade.state().generator(parse_gen(id)?).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))?;
                bag.insert("p_mw".to_string(), serde_json::json!(gen.p_mw));
                bag.insert("q_mvar".to_string(), serde_json::json!(gen.q_mvar));
            }
            ActuatorKind::LoadController => {
                let load = facade.state().load(parse_load(id)?).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))?;
                bag.insert("p_mw".to_string(), serde_json::json!(load.p_mw));
                bag.insert("q_mvar".to_string(), serde_json::json!(load.q_mvar));
            }
            ActuatorKind::VoltageRegulator => {
                let shunt = facade.state().shunt(parse_shunt(id)?).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))?;
                bag.insert("in_service".to_string(), serde_json::json!(shunt.in_service));
            }
            ActuatorKind::EnergyStorage => {
                let soc = self.soc.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(id).copied().unwrap_or(0.5);
                bag.insert("state_of_charge".to_string(), serde_json::json!(soc));
            }
        }
        Ok(bag)
    }

    /// Refuses a `discharge` that would take state of charge below
    /// [`MIN_DISCHARGE_SOC`], checked before the real grid mutation commits
    /// so a refused discharge never touches the facade.
    fn check_discharge_soc(&self, id: &str, action: &str, parameters: &serde_json::Value) -> Result<(), RegistryError> {
        if action != "discharge" {
            return Ok(());
        }
        let fraction = parameters.get("amount_mw").and_then(serde_json::Value::as_f64).unwrap_or(0.0) / 100.0;
        let soc = self.soc.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(id).copied().unwrap_or(0.5);
        if soc - fraction < MIN_DISCHARGE_SOC {
            return Err(RegistryError::InvalidAction { kind: self.kind.label().to_string(), action: "discharge below minimum state of charge".to_string() });
        }
        Ok(())
    }

    /// Applies the state-of-charge delta for a charge/discharge action that
    /// has already been checked and committed against the facade.
    fn apply_soc(&self, id: &str, action: &str, parameters: &serde_json::Value) {
        let fraction = parameters.get("amount_mw").and_then(serde_json::Value::as_f64).unwrap_or(0.0) / 100.0;
        let mut soc_map = self.soc.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let soc = soc_map.entry(id.to_string()).or_insert(0.5);
        match action {
            "charge" => *soc = (*soc + fraction).min(1.0),
            "discharge" => *soc = (*soc - fraction).max(0.0),
            _ => {}
        }
    }
}

impl Endpoint for Actuator {
    fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        let actuation_class = SafetyClass::MediumRisk;
        vec![
            ToolDescriptor {
                name: ToolName::from("control"),
                description: format!("Actuates a {} (actions: {}).", self.kind.label(), self.kind.valid_actions().join(", ")),
                input_schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}, "action": {"type": "string"}, "parameters": {"type": "object"}, "validate": {"type": "boolean"}}}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: actuation_class,
            },
            ToolDescriptor {
                name: ToolName::from("validate_action"),
                description: "Sandboxes an action without committing it.".to_string(),
                input_schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}, "action": {"type": "string"}, "parameters": {"type": "object"}}}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
            ToolDescriptor {
                name: ToolName::from("get_status"),
                description: "Reads a device's current attributes.".to_string(),
                input_schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}}}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
            ToolDescriptor {
                name: ToolName::from("list_devices"),
                description: "Lists every device id this endpoint owns.".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
            ToolDescriptor {
                name: ToolName::from("emergency_shutdown"),
                description: "Applies emergency_stop to every owned device.".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::Emergency,
            },
        ]
    }

    fn invoke(&self, tool_name: &str, arguments: serde_json::Value) -> Result<serde_json::Value, RegistryError> {
        match tool_name {
            "control" => {
                let id = arg_str(&arguments, "id")?;
                let action = arg_str(&arguments, "action")?;
                let parameters = arguments.get("parameters").cloned().unwrap_or_else(|| serde_json::json!({}));
                let validate = arguments.get("validate").and_then(serde_json::Value::as_bool).unwrap_or(true);
                let response = self.control(id, action, &parameters, validate)?;
                serde_json::to_value(response).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            "validate_action" => {
                let id = arg_str(&arguments, "id")?;
                let action = arg_str(&arguments, "action")?;
                let parameters = arguments.get("parameters").cloned().unwrap_or_else(|| serde_json::json!({}));
                let response = self.control(id, action, &parameters, true)?;
                serde_json::to_value(response).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            "get_status" => {
                let id = arg_str(&arguments, "id")?;
                let bag = self.device_state(id)?;
                serde_json::to_value(bag).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            "list_devices" => Ok(serde_json::json!({"ids": self.list_devices()})),
            "emergency_shutdown" => {
                let responses = self.emergency_shutdown()?;
                serde_json::to_value(responses).map_err(|err| RegistryError::Facade(err.to_string()))
            }
            other => Err(RegistryError::UnknownTool(other.to_string())),
        }
    }
}

impl PartialEq for ActuatorKind {
    fn eq(&self, other: &Self) -> bool {
        self.label() == other.label()
    }
}
impl Eq for ActuatorKind {}

fn apply_action(
    facade: &mut SimulationFacade,
    kind: ActuatorKind,
    id: &str,
    action: &str,
    parameters: &serde_json::Value,
) -> Result<(), FacadeError> {
    match kind {
        ActuatorKind::CircuitBreaker => {
            let line = parse_line(id).map_err(|_| FacadeError::ComponentNotFound(id.to_string()))?;
            match action {
                "close" => facade.set_line_in_service(line, true),
                _ => facade.set_line_in_service(line, false),
            }
        }
        ActuatorKind::Generator => {
            let gen = parse_gen(id).map_err(|_| FacadeError::ComponentNotFound(id.to_string()))?;
            match action {
                "set_output" => {
                    let p_mw = parameters.get("p_mw").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
                    let q_mvar = parameters.get("q_mvar").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
                    facade.set_generator_output(gen, p_mw, q_mvar)
                }
                "ramp" => {
                    let delta = parameters.get("delta_mw").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
                    let current = facade.state().generator(gen).map(|g| (g.p_mw, g.q_mvar)).unwrap_or((0.0, 0.0));
                    facade.set_generator_output(gen, current.0 + delta, current.1)
                }
                _ => facade.set_generator_output(gen, 0.0, 0.0),
            }
        }
        ActuatorKind::LoadController => {
            let load = parse_load(id).map_err(|_| FacadeError::ComponentNotFound(id.to_string()))?;
            match action {
                "scale" => {
                    let factor = parameters.get("factor").and_then(serde_json::Value::as_f64).unwrap_or(1.0);
                    facade.scale_load(load, factor)
                }
                "shed" => facade.scale_load(load, 0.0),
                "restore" => facade.scale_load(load, 1.0),
                _ => facade.scale_load(load, 0.0),
            }
        }
        ActuatorKind::VoltageRegulator => {
            let shunt = parse_shunt(id).map_err(|_| FacadeError::ComponentNotFound(id.to_string()))?;
            match action {
                "activate" => facade.set_shunt_status(shunt, true),
                _ => facade.set_shunt_status(shunt, false),
            }
        }
        ActuatorKind::EnergyStorage => {
            let bus = ess_bus(facade, id)?;
            let amount = parameters.get("amount_mw").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
            match action {
                "charge" => facade.inject_load_delta(bus, amount),
                "discharge" => facade.inject_load_delta(bus, -amount),
                _ => Ok(()),
            }
        }
    }
}

fn parse_line(id: &str) -> Result<LineId, RegistryError> {
    id.strip_prefix("line").and_then(|n| n.parse::<u8>().ok()).map(LineId).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
}
fn parse_gen(id: &str) -> Result<GeneratorId, RegistryError> {
    id.strip_prefix("gen").and_then(|n| n.parse::<u8>().ok()).map(GeneratorId).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
}
fn parse_load(id: &str) -> Result<LoadId, RegistryError> {
    id.strip_prefix("load").and_then(|n| n.parse::<u8>().ok()).map(LoadId).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
}
fn parse_shunt(id: &str) -> Result<ShuntId, RegistryError> {
    id.strip_prefix("shunt").and_then(|n| n.parse::<u8>().ok()).map(ShuntId).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
}
/// Resolves an energy storage device id (`essN`, synthesized one-per-
/// generator-bus per spec.md §4.5) to the bus it is attached to, by looking
/// up generator `N`'s bus on the live facade.
fn ess_bus(facade: &SimulationFacade, id: &str) -> Result<BusId, FacadeError> {
    let gen = id.strip_prefix("ess").and_then(|n| n.parse::<u8>().ok()).map(GeneratorId).ok_or_else(|| FacadeError::ComponentNotFound(id.to_string()))?;
    facade.state().generator(gen).map(|g| g.bus).ok_or_else(|| FacadeError::ComponentNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use super::*;

    fn shared_facade() -> SharedFacade {
        Arc::new(StdMutex::new(SimulationFacade::with_canonical_case()))
    }

    #[test]
    fn circuit_breaker_rejects_unknown_action() {
        let actuator = Actuator::new(ActuatorKind::CircuitBreaker, ZoneId::Zone1, shared_facade());
        let devices = actuator.list_devices();
        let result = actuator.control(&devices[0], "explode", &serde_json::json!({}), false);
        assert!(matches!(result, Err(RegistryError::InvalidAction { .. })));
    }

    #[test]
    fn circuit_breaker_alias_trip_normalizes_to_open() {
        let actuator = Actuator::new(ActuatorKind::CircuitBreaker, ZoneId::Zone1, shared_facade());
        let devices = actuator.list_devices();
        let response = actuator.control(&devices[0], "trip", &serde_json::json!({}), false).expect("control");
        assert!(response.success);
        assert_eq!(response.new_state.get("in_service"), Some(&serde_json::json!(false)));
    }

    #[test]
    fn voltage_regulator_alias_turn_on_normalizes_to_activate() {
        let actuator = Actuator::new(ActuatorKind::VoltageRegulator, ZoneId::Zone1, shared_facade());
        let devices = actuator.list_devices();
        if let Some(id) = devices.first() {
            let response = actuator.control(id, "turn_on", &serde_json::json!({}), false).expect("control");
            assert_eq!(response.new_state.get("in_service"), Some(&serde_json::json!(true)));
        }
    }

    #[test]
    fn generator_list_devices_matches_zone_membership() {
        let actuator = Actuator::new(ActuatorKind::Generator, ZoneId::Zone1, shared_facade());
        for id in actuator.list_devices() {
            assert!(id.starts_with("gen"));
        }
    }

    #[test]
    fn energy_storage_charges_and_discharges_against_its_generator_bus() {
        let actuator = Actuator::new(ActuatorKind::EnergyStorage, ZoneId::Zone1, shared_facade());
        let devices = actuator.list_devices();
        assert!(!devices.is_empty());
        let id = &devices[0];

        let charged = actuator.control(id, "charge", &serde_json::json!({"amount_mw": 10.0}), true).expect("control");
        assert!(charged.success);
        assert_eq!(charged.new_state.get("state_of_charge"), Some(&serde_json::json!(0.6)));

        let discharged = actuator.control(id, "discharge", &serde_json::json!({"amount_mw": 10.0}), true).expect("control");
        assert!(discharged.success);
        assert_eq!(discharged.new_state.get("state_of_charge"), Some(&serde_json::json!(0.5)));
    }

    #[test]
    fn energy_storage_refuses_discharge_below_minimum_soc_without_mutating_the_grid() {
        let actuator = Actuator::new(ActuatorKind::EnergyStorage, ZoneId::Zone1, shared_facade());
        let devices = actuator.list_devices();
        let id = &devices[0];

        let before = actuator.device_state(id).expect("state");
        let result = actuator.control(id, "discharge", &serde_json::json!({"amount_mw": 50.0}), false);
        assert!(matches!(result, Err(RegistryError::InvalidAction { .. })));
        let after = actuator.device_state(id).expect("state");
        assert_eq!(before, after);
    }
}
