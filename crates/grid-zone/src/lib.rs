// crates/grid-zone/src/lib.rs
// ============================================================================
// Crate: grid-zone
// Description: Deterministic per-zone protection engine (C7): violation
//              detection, corrective optimizers, the three-strike
//              escalation deadband, emergency islanding, and the zone
//              coordinator's endpoint surface.
// Purpose: Give each zone an independent, cheap, always-on protection
//          relay so the strategic agent (C9) is only woken for what local
//          rules genuinely cannot resolve.
// ============================================================================

//! ## Overview
//! A [`ZoneEngine`] owns one zone's thresholds and consecutive-violation
//! counter. Two zones never share mutable state with each other — each
//! reads the same [`grid_core::SimulationFacade`] but only ever touches
//! components its own [`grid_core::ZoneDescriptor`] owns — so cycles for
//! different zones may run concurrently (spec.md §5's per-zone ordering
//! guarantee). [`coordinator::ZoneCoordinator`] wraps a `ZoneEngine` behind
//! `grid_registry::Endpoint`, giving the dispatcher (C6) and the strategic
//! agent (C9) the same tool-call surface every other endpoint kind uses.

pub mod coordinator;
pub mod engine;
pub mod optimizer;
pub mod report;

pub use coordinator::ZoneCoordinator;
pub use engine::ZoneEngine;
pub use engine::ZoneState;
pub use engine::ESCALATION_DEADBAND_CYCLES;
pub use report::CorrectiveAction;
pub use report::EmergencyIslandingReport;
pub use report::LoadBalancingReport;
pub use report::LossMinimizationReport;
pub use report::SafetyRuleOutcome;
pub use report::VoltageRegulationReport;
