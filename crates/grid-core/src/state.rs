// crates/grid-core/src/state.rs
// ============================================================================
// Module: Grid State Data Model
// Description: Buses, lines, generators, loads, shunts, transformers, and the
//              scalar system frequency that together form the authoritative
//              electrical state.
// Purpose: Give every other crate one canonical, serializable shape for the
//          network instead of ad-hoc tuples.
// Dependencies: crate::identifiers, serde
// ============================================================================

//! ## Overview
//! `GridState` is the single owned entity mutated by the simulation facade
//! (`crate::facade`). Nothing outside `facade` mutates it directly; this
//! module only defines the shape.

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::BusId;
use crate::identifiers::GeneratorId;
use crate::identifiers::LineId;
use crate::identifiers::LoadId;
use crate::identifiers::ShuntId;
use crate::identifiers::TransformerId;

/// A network node with a voltage magnitude in per-unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    /// Bus identifier.
    pub id: BusId,
    /// Voltage magnitude, per-unit.
    pub vm_pu: f64,
}

/// A transmission line connecting two buses.
///
/// # Invariants
/// - `loading_percent` is recomputed after every successful power flow as
///   `current_ka / thermal_limit_ka * 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Line identifier.
    pub id: LineId,
    /// "From" bus endpoint.
    pub from_bus: BusId,
    /// "To" bus endpoint.
    pub to_bus: BusId,
    /// Whether the line is currently in service.
    pub in_service: bool,
    /// Loading percentage relative to the thermal limit.
    pub loading_percent: f64,
    /// Current flow, kilo-amps.
    pub current_ka: f64,
    /// Thermal limit, kilo-amps.
    pub thermal_limit_ka: f64,
}

/// A generator attached to a bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    /// Generator identifier.
    pub id: GeneratorId,
    /// Bus the generator is attached to.
    pub bus: BusId,
    /// Whether the generator is in service.
    pub in_service: bool,
    /// Active power setpoint, MW.
    pub p_mw: f64,
    /// Reactive power setpoint, MVAr.
    pub q_mvar: f64,
    /// Maximum active power, MW.
    pub max_p_mw: f64,
    /// Minimum active power, MW.
    pub min_p_mw: f64,
    /// Maximum reactive power, MVAr.
    pub max_q_mvar: f64,
    /// Minimum reactive power, MVAr.
    pub min_q_mvar: f64,
}

/// A load attached to a bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    /// Load identifier.
    pub id: LoadId,
    /// Bus the load is attached to.
    pub bus: BusId,
    /// Active power draw, MW.
    pub p_mw: f64,
    /// Reactive power draw, MVAr.
    pub q_mvar: f64,
}

/// A shunt compensator (capacitor bank) attached to a bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shunt {
    /// Shunt identifier.
    pub id: ShuntId,
    /// Bus the shunt is attached to.
    pub bus: BusId,
    /// Whether the shunt is currently in service (switched in).
    pub in_service: bool,
    /// Reactive power rating, MVAr.
    pub q_mvar_rated: f64,
}

/// A transformer with an inferred winding temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformer {
    /// Transformer identifier.
    pub id: TransformerId,
    /// Line this transformer models thermal behavior for.
    pub line: LineId,
    /// Inferred winding temperature, degrees Celsius.
    pub winding_temp_c: f64,
}

/// The authoritative electrical state owned by the simulation facade (C1).
///
/// # Invariants
/// - After every mutation accepted by the facade, this state is the output
///   of a converged power flow; a non-convergent mutation is never observed
///   by callers (the facade reverts it first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridState {
    /// Buses in ascending id order.
    pub buses: Vec<Bus>,
    /// Lines.
    pub lines: Vec<Line>,
    /// Generators.
    pub generators: Vec<Generator>,
    /// Loads.
    pub loads: Vec<Load>,
    /// Shunt compensators.
    pub shunts: Vec<Shunt>,
    /// Transformers.
    pub transformers: Vec<Transformer>,
    /// System frequency, Hz.
    pub frequency_hz: f64,
}

impl GridState {
    /// Total active generation, MW, across in-service generators.
    #[must_use]
    pub fn total_generation_mw(&self) -> f64 {
        self.generators.iter().filter(|g| g.in_service).map(|g| g.p_mw).sum()
    }

    /// Total active load, MW.
    #[must_use]
    pub fn total_load_mw(&self) -> f64 {
        self.loads.iter().map(|l| l.p_mw).sum()
    }

    /// Estimated total losses, MW: the non-negative remainder of generation
    /// minus load. A converged solved state always satisfies
    /// `generation ~= load + losses`.
    #[must_use]
    pub fn total_losses_mw(&self) -> f64 {
        (self.total_generation_mw() - self.total_load_mw()).max(0.0)
    }

    /// Finds a bus by id.
    #[must_use]
    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.iter().find(|b| b.id == id)
    }

    /// Finds a mutable bus by id.
    pub fn bus_mut(&mut self, id: BusId) -> Option<&mut Bus> {
        self.buses.iter_mut().find(|b| b.id == id)
    }

    /// Finds a line by id.
    #[must_use]
    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Finds a mutable line by id.
    pub fn line_mut(&mut self, id: LineId) -> Option<&mut Line> {
        self.lines.iter_mut().find(|l| l.id == id)
    }

    /// Finds a generator by id.
    #[must_use]
    pub fn generator(&self, id: GeneratorId) -> Option<&Generator> {
        self.generators.iter().find(|g| g.id == id)
    }

    /// Finds a mutable generator by id.
    pub fn generator_mut(&mut self, id: GeneratorId) -> Option<&mut Generator> {
        self.generators.iter_mut().find(|g| g.id == id)
    }

    /// Finds a load by id.
    #[must_use]
    pub fn load(&self, id: LoadId) -> Option<&Load> {
        self.loads.iter().find(|l| l.id == id)
    }

    /// Finds a mutable load by id.
    pub fn load_mut(&mut self, id: LoadId) -> Option<&mut Load> {
        self.loads.iter_mut().find(|l| l.id == id)
    }

    /// Finds a shunt by id.
    #[must_use]
    pub fn shunt(&self, id: ShuntId) -> Option<&Shunt> {
        self.shunts.iter().find(|s| s.id == id)
    }

    /// Finds a mutable shunt by id.
    pub fn shunt_mut(&mut self, id: ShuntId) -> Option<&mut Shunt> {
        self.shunts.iter_mut().find(|s| s.id == id)
    }

    /// Loads attached to the given bus.
    pub fn loads_at_bus(&self, bus: BusId) -> impl Iterator<Item = &Load> {
        self.loads.iter().filter(move |l| l.bus == bus)
    }

    /// Shunts attached to the given bus.
    pub fn shunts_at_bus(&self, bus: BusId) -> impl Iterator<Item = &Shunt> {
        self.shunts.iter().filter(move |s| s.bus == bus)
    }

    /// Generators attached to the given bus.
    pub fn generators_at_bus(&self, bus: BusId) -> impl Iterator<Item = &Generator> {
        self.generators.iter().filter(move |g| g.bus == bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::canonical_30_bus_case;

    #[test]
    fn power_balance_holds_on_clean_case() {
        let state = canonical_30_bus_case();
        let gen = state.total_generation_mw();
        let load = state.total_load_mw();
        let losses = state.total_losses_mw();
        assert!((gen - (load + losses)).abs() < 1.0);
    }

    #[test]
    fn voltage_window_on_clean_case() {
        let state = canonical_30_bus_case();
        for bus in &state.buses {
            assert!(
                (0.90..=1.10).contains(&bus.vm_pu),
                "bus {} voltage {} out of window",
                bus.id,
                bus.vm_pu
            );
        }
    }
}
