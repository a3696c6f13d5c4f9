// crates/grid-service/src/adapter.rs
// ============================================================================
// Module: Domain Adapter
// Description: The seam that lets the startup wiring sequence build a
//              fresh set of sensor, actuator, and coordinator endpoints
//              for whatever domain C1's facade represents.
// Purpose: Prove the control plane's C4/C5/C6/C9 machinery is domain-
//          agnostic, with power grid as the one fully wired domain.
// Dependencies: grid-core, grid-contract, grid-registry, grid-zone
// ============================================================================

//! ## Overview
//! [`DomainAdapter`] is the contract spec.md §4.12 describes: one
//! implementation per domain, each returning the live endpoints the
//! startup sequence registers with C4 and hands to C6. [`PowerGridAdapter`]
//! is the one full implementation this workspace ships; [`RoboticsAdapter`]
//! and [`SatelliteAdapter`] are stubs that satisfy the same contract with
//! empty endpoint sets, demonstrating that nothing above this seam assumes
//! power-grid specifics.

use std::collections::BTreeMap;
use std::sync::Arc;

use grid_core::ZoneId;
use grid_registry::Actuator;
use grid_registry::ActuatorKind;
use grid_registry::Domain;
use grid_registry::Endpoint;
use grid_registry::SharedFacade;
use grid_registry::Sensor;
use grid_registry::SensorKind;
use grid_registry::Tier;
use grid_store::AuditLog;
use grid_zone::ZoneCoordinator;
use grid_zone::ZoneEngine;

/// One endpoint this adapter wants registered, paired with the registry
/// metadata the startup sequence needs to build a [`grid_registry::ServerRecord`].
pub struct EndpointBlueprint {
    /// Short kind label, e.g. `"voltage_sensor"`, `"circuit_breaker"`.
    pub kind: String,
    /// Capability tier for registry filtering.
    pub tier: Tier,
    /// Owning zone, `None` for system-wide endpoints.
    pub zone: Option<ZoneId>,
    /// The live endpoint instance.
    pub endpoint: Arc<dyn Endpoint>,
}

/// Per-domain factory for the endpoints, coordinators, and descriptive
/// metadata the startup wiring sequence needs (spec.md §4.12).
pub trait DomainAdapter: Send + Sync {
    /// The domain this adapter builds endpoints for.
    fn domain(&self) -> Domain;

    /// Builds every sensor endpoint this domain exposes.
    fn create_sensors(&self, facade: &SharedFacade) -> Vec<EndpointBlueprint>;

    /// Builds every actuator endpoint this domain exposes.
    fn create_actuators(&self, facade: &SharedFacade) -> Vec<EndpointBlueprint>;

    /// Builds one zone coordinator per zone this domain partitions into.
    fn create_coordinators(
        &self,
        facade: &SharedFacade,
        bus: &Arc<grid_bus::EventBus>,
        audit: &Arc<AuditLog>,
        metrics: &Arc<dyn grid_core::telemetry::Metrics>,
    ) -> BTreeMap<ZoneId, Arc<ZoneCoordinator>>;

    /// Sensor kind labels this domain defines, for introspection.
    fn sensor_types(&self) -> Vec<&'static str>;

    /// Actuator kind labels this domain defines, for introspection.
    fn actuator_types(&self) -> Vec<&'static str>;

    /// Operating constraints this domain enforces, in prose, for the
    /// strategic agent's system context and for the `/domain` endpoint.
    fn constraints(&self) -> Vec<String>;

    /// Safety rules this domain's zone engines apply, in prose.
    fn safety_rules(&self) -> Vec<String>;
}

/// The one domain this workspace wires end to end: a three-zone,
/// thirty-bus power system.
#[derive(Debug, Default, Clone, Copy)]
pub struct PowerGridAdapter;

impl DomainAdapter for PowerGridAdapter {
    fn domain(&self) -> Domain {
        Domain::power_grid()
    }

    fn create_sensors(&self, facade: &SharedFacade) -> Vec<EndpointBlueprint> {
        let mut blueprints = Vec::new();
        for zone in ZoneId::ALL {
            for (kind, label) in [
                (SensorKind::Voltage, "voltage_sensor"),
                (SensorKind::Current, "current_sensor"),
                (SensorKind::Temperature, "temperature_sensor"),
                (SensorKind::PowerQuality, "power_quality_sensor"),
            ] {
                blueprints.push(EndpointBlueprint {
                    kind: label.to_string(),
                    tier: Tier::Sensing,
                    zone: Some(zone),
                    endpoint: Arc::new(Sensor::new(kind, Some(zone), facade.clone())),
                });
            }
        }
        blueprints.push(EndpointBlueprint {
            kind: "frequency_sensor".to_string(),
            tier: Tier::Sensing,
            zone: None,
            endpoint: Arc::new(Sensor::new(SensorKind::Frequency, None, facade.clone())),
        });
        blueprints
    }

    fn create_actuators(&self, facade: &SharedFacade) -> Vec<EndpointBlueprint> {
        let mut blueprints = Vec::new();
        for zone in ZoneId::ALL {
            for (kind, label) in [
                (ActuatorKind::CircuitBreaker, "circuit_breaker"),
                (ActuatorKind::Generator, "generator"),
                (ActuatorKind::LoadController, "load_controller"),
                (ActuatorKind::VoltageRegulator, "voltage_regulator"),
                (ActuatorKind::EnergyStorage, "energy_storage"),
            ] {
                blueprints.push(EndpointBlueprint {
                    kind: label.to_string(),
                    tier: Tier::Actuation,
                    zone: Some(zone),
                    endpoint: Arc::new(Actuator::new(kind, zone, facade.clone())),
                });
            }
        }
        blueprints
    }

    fn create_coordinators(
        &self,
        facade: &SharedFacade,
        bus: &Arc<grid_bus::EventBus>,
        audit: &Arc<AuditLog>,
        metrics: &Arc<dyn grid_core::telemetry::Metrics>,
    ) -> BTreeMap<ZoneId, Arc<ZoneCoordinator>> {
        ZoneId::ALL
            .into_iter()
            .map(|zone| {
                let engine = ZoneEngine::new(zone, facade.clone(), bus.clone(), audit.clone(), metrics.clone());
                (zone, Arc::new(ZoneCoordinator::new(engine)))
            })
            .collect()
    }

    fn sensor_types(&self) -> Vec<&'static str> {
        vec!["voltage", "current", "temperature", "frequency", "power_quality"]
    }

    fn actuator_types(&self) -> Vec<&'static str> {
        vec!["circuit_breaker", "generator", "load_controller", "voltage_regulator", "energy_storage"]
    }

    fn constraints(&self) -> Vec<String> {
        vec![
            "bus voltage must stay within 0.95-1.05 per unit".to_string(),
            "line and transformer loading must stay at or below 100 percent of rated capacity".to_string(),
            "system frequency must stay within 59.5-60.5 Hz".to_string(),
            "energy storage may not discharge below its minimum state of charge".to_string(),
        ]
    }

    fn safety_rules(&self) -> Vec<String> {
        vec![
            "a zone's protection engine corrects a violation locally for up to two consecutive cycles before escalating".to_string(),
            "every proposed actuation is validated in a sandboxed rollback before it is applied for real".to_string(),
            "a non-convergent power flow reverts to the pre-action state rather than leaving the grid in an unsolved condition".to_string(),
        ]
    }
}

/// Stub adapter for a robotics fleet domain. Demonstrates that
/// [`DomainAdapter`] generalizes beyond power systems; no endpoints are
/// wired to a facade that does not model robots.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoboticsAdapter;

impl DomainAdapter for RoboticsAdapter {
    fn domain(&self) -> Domain {
        Domain("robotics_fleet".to_string())
    }

    fn create_sensors(&self, _facade: &SharedFacade) -> Vec<EndpointBlueprint> {
        Vec::new()
    }

    fn create_actuators(&self, _facade: &SharedFacade) -> Vec<EndpointBlueprint> {
        Vec::new()
    }

    fn create_coordinators(
        &self,
        _facade: &SharedFacade,
        _bus: &Arc<grid_bus::EventBus>,
        _audit: &Arc<AuditLog>,
        _metrics: &Arc<dyn grid_core::telemetry::Metrics>,
    ) -> BTreeMap<ZoneId, Arc<ZoneCoordinator>> {
        BTreeMap::new()
    }

    fn sensor_types(&self) -> Vec<&'static str> {
        vec!["joint_position", "battery_level", "proximity"]
    }

    fn actuator_types(&self) -> Vec<&'static str> {
        vec!["drive_motor", "gripper", "emergency_brake"]
    }

    fn constraints(&self) -> Vec<String> {
        vec!["no two fleet members may occupy the same cell of the shared workspace grid".to_string()]
    }

    fn safety_rules(&self) -> Vec<String> {
        vec!["an emergency brake command always bypasses queued motion commands".to_string()]
    }
}

/// Stub adapter for a satellite constellation domain.
#[derive(Debug, Default, Clone, Copy)]
pub struct SatelliteAdapter;

impl DomainAdapter for SatelliteAdapter {
    fn domain(&self) -> Domain {
        Domain("satellite_constellation".to_string())
    }

    fn create_sensors(&self, _facade: &SharedFacade) -> Vec<EndpointBlueprint> {
        Vec::new()
    }

    fn create_actuators(&self, _facade: &SharedFacade) -> Vec<EndpointBlueprint> {
        Vec::new()
    }

    fn create_coordinators(
        &self,
        _facade: &SharedFacade,
        _bus: &Arc<grid_bus::EventBus>,
        _audit: &Arc<AuditLog>,
        _metrics: &Arc<dyn grid_core::telemetry::Metrics>,
    ) -> BTreeMap<ZoneId, Arc<ZoneCoordinator>> {
        BTreeMap::new()
    }

    fn sensor_types(&self) -> Vec<&'static str> {
        vec!["battery_charge", "attitude", "link_budget"]
    }

    fn actuator_types(&self) -> Vec<&'static str> {
        vec!["thruster", "solar_panel_tilt", "transponder"]
    }

    fn constraints(&self) -> Vec<String> {
        vec!["propellant reserves must never be spent below the deorbit reserve margin".to_string()]
    }

    fn safety_rules(&self) -> Vec<String> {
        vec!["a predicted conjunction always takes precedence over a scheduled maneuver".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use grid_core::SimulationFacade;

    use super::*;

    fn facade() -> SharedFacade {
        Arc::new(Mutex::new(SimulationFacade::with_canonical_case()))
    }

    #[test]
    fn power_grid_adapter_builds_one_frequency_sensor_and_four_per_zone() {
        let adapter = PowerGridAdapter;
        let sensors = adapter.create_sensors(&facade());
        let frequency_count = sensors.iter().filter(|b| b.kind == "frequency_sensor").count();
        assert_eq!(frequency_count, 1);
        assert_eq!(sensors.len(), ZoneId::ALL.len() * 4 + 1);
    }

    #[test]
    fn power_grid_adapter_builds_five_actuator_kinds_per_zone() {
        let adapter = PowerGridAdapter;
        let actuators = adapter.create_actuators(&facade());
        assert_eq!(actuators.len(), ZoneId::ALL.len() * 5);
        assert!(actuators.iter().all(|b| b.zone.is_some()));
    }

    #[test]
    fn power_grid_adapter_builds_one_coordinator_per_zone() {
        let adapter = PowerGridAdapter;
        let bus = Arc::new(grid_bus::EventBus::new());
        let audit = Arc::new(AuditLog::open_in_memory().unwrap_or_else(|err| panic!("open audit: {err}")));
        let metrics: Arc<dyn grid_core::telemetry::Metrics> = Arc::new(grid_core::telemetry::NoopMetrics);
        let coordinators = adapter.create_coordinators(&facade(), &bus, &audit, &metrics);
        assert_eq!(coordinators.len(), ZoneId::ALL.len());
    }

    #[test]
    fn stub_adapters_report_their_domain_with_no_live_endpoints() {
        let facade = facade();
        let bus = Arc::new(grid_bus::EventBus::new());
        let audit = Arc::new(AuditLog::open_in_memory().unwrap_or_else(|err| panic!("open audit: {err}")));
        let metrics: Arc<dyn grid_core::telemetry::Metrics> = Arc::new(grid_core::telemetry::NoopMetrics);

        let robotics = RoboticsAdapter;
        assert_eq!(robotics.domain().0, "robotics_fleet");
        assert!(robotics.create_sensors(&facade).is_empty());
        assert!(robotics.create_coordinators(&facade, &bus, &audit, &metrics).is_empty());

        let satellite = SatelliteAdapter;
        assert_eq!(satellite.domain().0, "satellite_constellation");
        assert!(satellite.create_actuators(&facade).is_empty());
    }
}
