// crates/grid-monitor/src/health.rs
// ============================================================================
// Module: Grid State Snapshot & Zone Health
// Description: Builds the public, dashboard-facing grid state message
//              (spec.md §6) and the per-zone healthy/warning/critical
//              classification the monitoring loop publishes every cycle.
// Dependencies: grid-core
// ============================================================================

//! ## Overview
//! Nothing here mutates C1; this module only projects [`GridState`] and a
//! violation list into the wire shape `GET`/subscription clients expect.
//! Bus coordinates are not part of the data model (spec.md §3 has no
//! layout concept), so `layout_for` synthesizes a deterministic ring
//! position per zone purely for the dashboard's benefit.

use std::collections::BTreeMap;

use grid_core::BusId;
use grid_core::GridState;
use grid_core::Timestamp;
use grid_core::ViolationEvent;
use grid_core::ZoneId;
use serde::Deserialize;
use serde::Serialize;

/// Per-zone health classification published alongside every grid state
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneHealth {
    Healthy,
    Warning,
    Critical,
}

/// A network node projected for the dashboard, with a synthesized layout
/// position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub vm_pu: f64,
    pub x: f64,
    pub y: f64,
    pub zone: String,
}

/// A transmission line projected for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeView {
    pub id: String,
    pub loading_percent: f64,
    pub from_bus: String,
    pub to_bus: String,
}

/// The public grid state message published on the `grid_state` channel
/// every monitoring cycle (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridStateMessage {
    pub timestamp: i64,
    pub total_generation_mw: f64,
    pub total_load_mw: f64,
    pub total_losses_mw: f64,
    pub frequency_hz: f64,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub zone_health: BTreeMap<String, ZoneHealth>,
    pub violations: Vec<ViolationEvent>,
}

/// Number of buses laid out around one zone's ring, matching
/// `grid_core::fixtures`'s ten-bus-per-zone topology.
const RING_SIZE: f64 = 10.0;
/// Radius of each zone's bus ring.
const RING_RADIUS: f64 = 5.0;
/// Horizontal spacing between adjacent zone rings.
const ZONE_SPACING: f64 = 15.0;

/// Deterministic dashboard layout position for `bus`, purely cosmetic:
/// each zone's buses sit on a ring, rings placed left to right by zone.
#[must_use]
fn layout_for(bus: BusId) -> (f64, f64) {
    let zone = ZoneId::owning(bus);
    let zone_index = ZoneId::ALL.iter().position(|z| *z == zone).unwrap_or(0) as f64;
    let offset_in_zone = f64::from(bus.0 % 10);
    let angle = offset_in_zone / RING_SIZE * std::f64::consts::TAU;
    let cx = zone_index * ZONE_SPACING;
    (cx + RING_RADIUS * angle.cos(), RING_RADIUS * angle.sin())
}

/// Counts violations per zone, ignoring system-wide frequency events
/// (which carry `zone: None`).
fn violations_per_zone(violations: &[ViolationEvent]) -> BTreeMap<ZoneId, usize> {
    let mut counts = BTreeMap::new();
    for zone in ZoneId::ALL {
        counts.insert(zone, 0);
    }
    for violation in violations {
        if let Some(zone) = violation.zone {
            *counts.entry(zone).or_insert(0) += 1;
        }
    }
    counts
}

/// Classifies a zone's health from its violation count this cycle: zero
/// is healthy, one or two is a warning, three or more is critical.
#[must_use]
pub fn classify(violation_count: usize) -> ZoneHealth {
    match violation_count {
        0 => ZoneHealth::Healthy,
        1 | 2 => ZoneHealth::Warning,
        _ => ZoneHealth::Critical,
    }
}

/// Computes the `zone_health` map published with every snapshot.
#[must_use]
pub fn zone_health_map(violations: &[ViolationEvent]) -> BTreeMap<String, ZoneHealth> {
    violations_per_zone(violations).into_iter().map(|(zone, count)| (zone.to_string(), classify(count))).collect()
}

/// Builds the full public snapshot message from the current grid state
/// and this cycle's detected violations.
#[must_use]
pub fn build_snapshot(state: &GridState, violations: Vec<ViolationEvent>) -> GridStateMessage {
    let nodes = state
        .buses
        .iter()
        .map(|bus| {
            let (x, y) = layout_for(bus.id);
            NodeView { id: bus.id.to_string(), vm_pu: bus.vm_pu, x, y, zone: ZoneId::owning(bus.id).to_string() }
        })
        .collect();
    let edges = state
        .lines
        .iter()
        .map(|line| EdgeView {
            id: line.id.to_string(),
            loading_percent: line.loading_percent,
            from_bus: line.from_bus.to_string(),
            to_bus: line.to_bus.to_string(),
        })
        .collect();
    let zone_health = zone_health_map(&violations);
    GridStateMessage {
        timestamp: Timestamp::now().as_millis(),
        total_generation_mw: state.total_generation_mw(),
        total_load_mw: state.total_load_mw(),
        total_losses_mw: state.total_losses_mw(),
        frequency_hz: state.frequency_hz,
        nodes,
        edges,
        zone_health,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::Severity;
    use grid_core::ViolationKind;

    fn violation(zone: Option<ZoneId>) -> ViolationEvent {
        ViolationEvent {
            kind: ViolationKind::VoltageLow,
            zone,
            severity: Severity::Warning,
            component: "bus0".to_string(),
            measured: 0.9,
            limit: 0.95,
            at: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn classify_buckets_match_spec_thresholds() {
        assert_eq!(classify(0), ZoneHealth::Healthy);
        assert_eq!(classify(1), ZoneHealth::Warning);
        assert_eq!(classify(2), ZoneHealth::Warning);
        assert_eq!(classify(3), ZoneHealth::Critical);
    }

    #[test]
    fn zone_health_map_covers_every_zone_even_when_clean() {
        let map = zone_health_map(&[]);
        assert_eq!(map.len(), 3);
        assert!(map.values().all(|h| *h == ZoneHealth::Healthy));
    }

    #[test]
    fn frequency_violations_do_not_attribute_to_any_zone() {
        let violations = vec![violation(None), violation(Some(ZoneId::Zone1))];
        let map = zone_health_map(&violations);
        assert_eq!(map.get("zone1"), Some(&ZoneHealth::Warning));
        assert_eq!(map.get("zone2"), Some(&ZoneHealth::Healthy));
    }

    #[test]
    fn build_snapshot_reports_one_node_per_bus() {
        let state = grid_core::fixtures::canonical_30_bus_case();
        let snapshot = build_snapshot(&state, vec![]);
        assert_eq!(snapshot.nodes.len(), state.buses.len());
        assert_eq!(snapshot.edges.len(), state.lines.len());
    }
}
