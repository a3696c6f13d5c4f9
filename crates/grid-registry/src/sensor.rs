// crates/grid-registry/src/sensor.rs
// ============================================================================
// Module: Sensor Endpoint (C5)
// Description: Read-only measurement endpoint over bus voltage, line
//              current, transformer temperature, system frequency, and
//              per-zone power quality.
// Purpose: Give the agent and C7 a uniform `read_sensor`/`list_sensors`
//          surface regardless of measurement kind.
// Dependencies: grid-core, grid-contract
// ============================================================================

//! ## Overview
//! One [`Sensor`] instance covers every id of its [`SensorKind`] within its
//! zone (or, for frequency, the whole system). A threshold installed via
//! `set_threshold` attaches an `alert` field to future reads that cross it
//! (spec.md §4.5).

use std::collections::HashMap;
use std::sync::Mutex;

use grid_contract::SafetyClass;
use grid_contract::ToolDescriptor;
use grid_contract::ToolName;
use grid_core::ZoneId;

use crate::endpoint::arg_f64;
use crate::endpoint::arg_str;
use crate::endpoint::lock_facade;
use crate::endpoint::Endpoint;
use crate::endpoint::SharedFacade;
use crate::error::RegistryError;

/// The measurement kind a [`Sensor`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Bus voltage magnitude, per-unit. One id per owned bus.
    Voltage,
    /// Line current, kilo-amps. One id per owned line.
    Current,
    /// Transformer winding temperature, Celsius. One id per owned
    /// transformer.
    Temperature,
    /// System frequency, Hz. A single system-wide id.
    Frequency,
    /// Total harmonic distortion, percent. One synthesized id per zone.
    PowerQuality,
}

impl SensorKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Voltage => "voltage",
            Self::Current => "current",
            Self::Temperature => "temperature",
            Self::Frequency => "frequency",
            Self::PowerQuality => "power_quality",
        }
    }

    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Voltage => "per_unit",
            Self::Current => "kA",
            Self::Temperature => "celsius",
            Self::Frequency => "Hz",
            Self::PowerQuality => "percent_thd",
        }
    }
}

/// A read-only measurement endpoint over one [`SensorKind`] within one
/// zone (or system-wide, for frequency).
pub struct Sensor {
    kind: SensorKind,
    zone: Option<ZoneId>,
    facade: SharedFacade,
    thresholds: Mutex<HashMap<String, (f64, f64)>>,
}

impl Sensor {
    /// Builds a sensor of `kind` over `zone` (pass `None` for the one
    /// system-wide frequency sensor).
    #[must_use]
    pub fn new(kind: SensorKind, zone: Option<ZoneId>, facade: SharedFacade) -> Self {
        Self { kind, zone, facade, thresholds: Mutex::new(HashMap::new()) }
    }

    /// Ids this sensor currently covers.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let facade = lock_facade(&self.facade);
        match self.kind {
            SensorKind::Voltage => owned_buses(&facade, self.zone).iter().map(ToString::to_string).collect(),
            SensorKind::Current => owned_lines(&facade, self.zone).iter().map(ToString::to_string).collect(),
            SensorKind::Temperature => facade
                .state()
                .transformers
                .iter()
                .filter(|t| line_in_zone(&facade, t.line, self.zone))
                .map(|t| t.id.to_string())
                .collect(),
            SensorKind::Frequency => vec!["system".to_string()],
            SensorKind::PowerQuality => vec![self.zone.map_or_else(|| "system".to_string(), |z| z.to_string())],
        }
    }

    fn read_one(&self, id: &str) -> Result<f64, RegistryError> {
        let facade = lock_facade(&self.facade);
        match self.kind {
            SensorKind::Voltage => {
                let bus_id = parse_bus_id(id)?;
                facade.state().bus(bus_id).map(|b| b.vm_pu).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
            }
            SensorKind::Current => {
                let line_id = parse_line_id(id)?;
                facade
                    .state()
                    .line(line_id)
                    .map(|l| l.current_ka)
                    .ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
            }
            SensorKind::Temperature => {
                let xfmr_id = parse_xfmr_id(id)?;
                facade.transformer_temperature(xfmr_id).ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
            }
            SensorKind::Frequency => Ok(facade.state().frequency_hz),
            SensorKind::PowerQuality => {
                // No harmonic model exists in C1; synthesize a THD proxy from
                // the zone's worst voltage deviation, which tracks the same
                // underlying disturbance a real THD meter would pick up on.
                let zone = self.zone;
                let worst_deviation = owned_buses(&facade, zone)
                    .iter()
                    .filter_map(|&id| facade.state().bus(id))
                    .map(|b| (b.vm_pu - 1.0).abs())
                    .fold(0.0_f64, f64::max);
                Ok((worst_deviation * 20.0).min(15.0))
            }
        }
    }

    fn attach_alert(&self, id: &str, value: f64) -> serde_json::Value {
        let thresholds = self.thresholds.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut reading = serde_json::json!({"id": id, "value": value, "unit": self.kind.unit()});
        if let Some((min, max)) = thresholds.get(id)
            && (value < *min || value > *max)
        {
            reading["alert"] = serde_json::json!(format!("{} out of range [{min}, {max}]", self.kind.label()));
        }
        reading
    }
}

impl Endpoint for Sensor {
    fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        let schema = serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}}});
        vec![
            ToolDescriptor {
                name: ToolName::from("read_sensor"),
                description: format!("Reads a single {} sensor by id.", self.kind.label()),
                input_schema: schema.clone(),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
            ToolDescriptor {
                name: ToolName::from("read_sensors_batch"),
                description: format!("Reads multiple {} sensors by id.", self.kind.label()),
                input_schema: serde_json::json!({"type": "object", "properties": {"ids": {"type": "array"}}}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
            ToolDescriptor {
                name: ToolName::from("list_sensors"),
                description: format!("Lists every {} sensor id this endpoint covers.", self.kind.label()),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
            ToolDescriptor {
                name: ToolName::from("set_threshold"),
                description: "Installs a min/max alert threshold for one sensor id.".to_string(),
                input_schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}, "min": {"type": "number"}, "max": {"type": "number"}}}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
            ToolDescriptor {
                name: ToolName::from("get_metadata"),
                description: "Returns sensor kind, unit, and zone metadata.".to_string(),
                input_schema: schema,
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: SafetyClass::ReadOnly,
            },
        ]
    }

    fn invoke(&self, tool_name: &str, arguments: serde_json::Value) -> Result<serde_json::Value, RegistryError> {
        match tool_name {
            "read_sensor" => {
                let id = arg_str(&arguments, "id")?;
                let value = self.read_one(id)?;
                Ok(self.attach_alert(id, value))
            }
            "read_sensors_batch" => {
                let ids = arguments
                    .get("ids")
                    .and_then(serde_json::Value::as_array)
                    .ok_or_else(|| RegistryError::UnknownDevice("missing 'ids' array".to_string()))?;
                let mut readings = Vec::new();
                for raw_id in ids {
                    let id = raw_id.as_str().ok_or_else(|| RegistryError::UnknownDevice("id must be a string".to_string()))?;
                    let value = self.read_one(id)?;
                    readings.push(self.attach_alert(id, value));
                }
                Ok(serde_json::json!({"readings": readings}))
            }
            "list_sensors" => Ok(serde_json::json!({"ids": self.ids()})),
            "set_threshold" => {
                let id = arg_str(&arguments, "id")?.to_string();
                let min = arg_f64(&arguments, "min")?;
                let max = arg_f64(&arguments, "max")?;
                self.thresholds.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(id, (min, max));
                Ok(serde_json::json!({"ok": true}))
            }
            "get_metadata" => Ok(serde_json::json!({
                "kind": self.kind.label(),
                "unit": self.kind.unit(),
                "zone": self.zone.map(|z| z.to_string()),
            })),
            other => Err(RegistryError::UnknownTool(other.to_string())),
        }
    }
}

fn owned_buses(facade: &grid_core::SimulationFacade, zone: Option<ZoneId>) -> Vec<grid_core::BusId> {
    match zone {
        Some(zone) => grid_core::ZoneDescriptor::derive(facade.state(), zone).buses,
        None => facade.state().buses.iter().map(|b| b.id).collect(),
    }
}

fn owned_lines(facade: &grid_core::SimulationFacade, zone: Option<ZoneId>) -> Vec<grid_core::LineId> {
    match zone {
        Some(zone) => grid_core::ZoneDescriptor::derive(facade.state(), zone).lines,
        None => facade.state().lines.iter().map(|l| l.id).collect(),
    }
}

fn line_in_zone(facade: &grid_core::SimulationFacade, line: grid_core::LineId, zone: Option<ZoneId>) -> bool {
    owned_lines(facade, zone).contains(&line)
}

fn parse_bus_id(id: &str) -> Result<grid_core::BusId, RegistryError> {
    id.strip_prefix("bus")
        .and_then(|n| n.parse::<u8>().ok())
        .map(grid_core::BusId)
        .ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
}

fn parse_line_id(id: &str) -> Result<grid_core::LineId, RegistryError> {
    id.strip_prefix("line")
        .and_then(|n| n.parse::<u8>().ok())
        .map(grid_core::LineId)
        .ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
}

fn parse_xfmr_id(id: &str) -> Result<grid_core::TransformerId, RegistryError> {
    id.strip_prefix("xfmr")
        .and_then(|n| n.parse::<u8>().ok())
        .map(grid_core::TransformerId)
        .ok_or_else(|| RegistryError::UnknownDevice(id.to_string()))
}
