// crates/grid-core/src/identifiers.rs
// ============================================================================
// Module: Grid Core Identifiers
// Description: Canonical opaque identifiers for buses, lines, and other grid
//              components, plus zone and server identifiers.
// Purpose: Provide strongly typed, serializable identifiers with stable wire
//          forms instead of bare integers or strings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers here are newtypes over small integers or interned strings so
//! that a bus id can never be passed where a line id is expected. All types
//! are `Copy` where the backing representation allows it.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Identifies a bus (network node) by its 0-based index in the canonical
/// 30-bus case.
///
/// # Invariants
/// - Always `< 30` for the reference case; callers constructing out-of-range
///   ids get a facade error at first use, not at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(pub u8);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus{}", self.0)
    }
}

/// Identifies a transmission line by its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u8);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line{}", self.0)
    }
}

/// Identifies a generator by its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratorId(pub u8);

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Identifies a load by its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(pub u8);

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load{}", self.0)
    }
}

/// Identifies a shunt compensator (capacitor bank) by its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShuntId(pub u8);

impl fmt::Display for ShuntId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shunt{}", self.0)
    }
}

/// Identifies a transformer by its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformerId(pub u8);

impl fmt::Display for TransformerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xfmr{}", self.0)
    }
}

/// Identifies one of the three protection zones.
///
/// # Invariants
/// - Zone partition is fixed: buses 0-9 -> `Zone1`, 10-19 -> `Zone2`,
///   20-29 -> `Zone3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneId {
    /// Buses 0-9.
    Zone1,
    /// Buses 10-19.
    Zone2,
    /// Buses 20-29.
    Zone3,
}

impl ZoneId {
    /// All zone identifiers, in order.
    pub const ALL: [ZoneId; 3] = [ZoneId::Zone1, ZoneId::Zone2, ZoneId::Zone3];

    /// Returns the zone owning the given bus, under the fixed partition.
    #[must_use]
    pub const fn owning(bus: BusId) -> Self {
        match bus.0 {
            0..=9 => ZoneId::Zone1,
            10..=19 => ZoneId::Zone2,
            _ => ZoneId::Zone3,
        }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ZoneId::Zone1 => "zone1",
            ZoneId::Zone2 => "zone2",
            ZoneId::Zone3 => "zone3",
        };
        f.write_str(label)
    }
}

/// Opaque, stable identifier for an endpoint registered with the registry
/// (C4). Servers mint their own id at construction (kind + zone + random
/// suffix) and keep it for their process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub String);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ServerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ServerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_partition_matches_fixed_boundaries() {
        assert_eq!(ZoneId::owning(BusId(0)), ZoneId::Zone1);
        assert_eq!(ZoneId::owning(BusId(9)), ZoneId::Zone1);
        assert_eq!(ZoneId::owning(BusId(10)), ZoneId::Zone2);
        assert_eq!(ZoneId::owning(BusId(19)), ZoneId::Zone2);
        assert_eq!(ZoneId::owning(BusId(20)), ZoneId::Zone3);
        assert_eq!(ZoneId::owning(BusId(29)), ZoneId::Zone3);
    }

    #[test]
    fn server_id_display_is_the_raw_string() {
        let id = ServerId::from("voltage-sensor-zone1-ab12");
        assert_eq!(id.to_string(), "voltage-sensor-zone1-ab12");
    }
}
