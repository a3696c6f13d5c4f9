// crates/grid-core/src/lib.rs
// ============================================================================
// Crate: grid-core
// Description: Data model, simulation facade, snapshot/rollback, zone
//              partitioning, and the dependency-light telemetry hook shared
//              by every other crate in the workspace.
// Purpose: The single source of truth for electrical state (C1 in
//          spec.md/SPEC_FULL.md).
// ============================================================================

//! ## Overview
//! `grid-core` owns [`facade::SimulationFacade`], the only thing in the
//! workspace holding a [`state::GridState`] by value. Everything else —
//! endpoints, zone engines, the monitoring loop — goes through the facade.

pub mod facade;
pub mod fixtures;
pub mod identifiers;
pub mod solver;
pub mod state;
pub mod telemetry;
pub mod time;
pub mod violation;
pub mod zone;

pub use facade::FacadeError;
pub use facade::ProtectionThresholds;
pub use facade::SimulationFacade;
pub use facade::Snapshot;
pub use facade::ValidationOutcome;
pub use identifiers::BusId;
pub use identifiers::GeneratorId;
pub use identifiers::LineId;
pub use identifiers::LoadId;
pub use identifiers::ServerId;
pub use identifiers::ShuntId;
pub use identifiers::TransformerId;
pub use identifiers::ZoneId;
pub use solver::PowerFlowSolver;
pub use solver::ReferenceSolver;
pub use solver::SolveError;
pub use state::GridState;
pub use time::Timestamp;
pub use violation::Severity;
pub use violation::ViolationEvent;
pub use violation::ViolationKind;
pub use zone::ZoneDescriptor;
