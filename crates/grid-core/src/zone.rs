// crates/grid-core/src/zone.rs
// ============================================================================
// Module: Zone Partition
// Description: Derives each zone's owned bus and line sets from the fixed
//              partition rule (buses 0-9/10-19/20-29).
// Purpose: Give every consumer (C1 reads, C7 engines, C10 grouping) one
//          shared derivation instead of re-deriving zone membership.
// Dependencies: crate::identifiers, crate::state
// ============================================================================

//! ## Overview
//! A [`ZoneDescriptor`] is a read-only view computed from [`GridState`]'s
//! topology; it is not itself mutable state. "Owned" means both endpoints
//! fall in the zone — a tie-line belongs to none (spec.md §3 invariant).

use crate::identifiers::BusId;
use crate::identifiers::LineId;
use crate::identifiers::ZoneId;
use crate::state::GridState;

/// A zone's owned bus and line sets, derived from the current topology.
///
/// # Invariants
/// - `buses` partitions the full bus set across the three zones (every bus
///   belongs to exactly one zone).
/// - `lines` contains only lines whose both endpoints are in `buses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDescriptor {
    /// The zone identifier.
    pub zone: ZoneId,
    /// Buses owned by this zone.
    pub buses: Vec<BusId>,
    /// Lines owned by this zone (both endpoints inside `buses`).
    pub lines: Vec<LineId>,
}

impl ZoneDescriptor {
    /// Derives the descriptor for `zone` from the grid's current topology.
    #[must_use]
    pub fn derive(state: &GridState, zone: ZoneId) -> Self {
        let buses: Vec<BusId> =
            state.buses.iter().map(|b| b.id).filter(|&id| ZoneId::owning(id) == zone).collect();
        let lines: Vec<LineId> = state
            .lines
            .iter()
            .filter(|l| buses.contains(&l.from_bus) && buses.contains(&l.to_bus))
            .map(|l| l.id)
            .collect();
        Self { zone, buses, lines }
    }

    /// Derives descriptors for all three zones.
    #[must_use]
    pub fn derive_all(state: &GridState) -> Vec<Self> {
        ZoneId::ALL.iter().map(|&zone| Self::derive(state, zone)).collect()
    }

    /// Tie-lines with exactly one endpoint in this zone (used by emergency
    /// islanding, C7).
    #[must_use]
    pub fn tie_lines(&self, state: &GridState) -> Vec<LineId> {
        state
            .lines
            .iter()
            .filter(|l| {
                let from_in = self.buses.contains(&l.from_bus);
                let to_in = self.buses.contains(&l.to_bus);
                from_in != to_in
            })
            .map(|l| l.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::canonical_30_bus_case;

    #[test]
    fn zones_partition_all_buses_without_overlap() {
        let state = canonical_30_bus_case();
        let descriptors = ZoneDescriptor::derive_all(&state);
        let mut all_buses: Vec<BusId> = descriptors.iter().flat_map(|d| d.buses.clone()).collect();
        all_buses.sort();
        let expected: Vec<BusId> = (0..30u8).map(BusId).collect();
        assert_eq!(all_buses, expected);
    }

    #[test]
    fn tie_lines_belong_to_no_zone_line_set() {
        let state = canonical_30_bus_case();
        let descriptors = ZoneDescriptor::derive_all(&state);
        for line in &state.lines {
            let owners: Vec<_> =
                descriptors.iter().filter(|d| d.lines.contains(&line.id)).collect();
            assert!(owners.len() <= 1);
        }
        // The three configured tie-lines are owned by no zone.
        let tie_ids = [LineId(30), LineId(31), LineId(32)];
        for id in tie_ids {
            assert!(descriptors.iter().all(|d| !d.lines.contains(&id)));
        }
    }

    #[test]
    fn zone2_tie_lines_are_its_two_boundary_lines() {
        let state = canonical_30_bus_case();
        let zone2 = ZoneDescriptor::derive(&state, ZoneId::Zone2);
        let tie = zone2.tie_lines(&state);
        assert_eq!(tie.len(), 2);
    }
}
