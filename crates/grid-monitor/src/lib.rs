// crates/grid-monitor/src/lib.rs
// ============================================================================
// Crate: grid-monitor
// Description: The fixed-period monitoring loop (C10): detection, per-zone
//              safety rule dispatch, escalation to the strategic agent, and
//              the public grid state snapshot publish.
// Purpose: The one component that advances the control plane's clock.
// ============================================================================

//! ## Overview
//! `grid-monitor` has no state of its own beyond cycle counters: it is
//! pure orchestration over [`grid_core::SimulationFacade`] (C1),
//! [`grid_zone::ZoneCoordinator`] (C7), and [`grid_agent::StrategicAgent`]
//! (C9), all constructed and owned by the composition root in
//! `grid-service` and handed in by reference.

pub mod cycle;
pub mod error;
pub mod health;
pub mod loadgen;

pub use cycle::CycleReport;
pub use cycle::MonitorConfig;
pub use cycle::MonitoringLoop;
pub use error::MonitorError;
pub use health::build_snapshot;
pub use health::classify;
pub use health::zone_health_map;
pub use health::EdgeView;
pub use health::GridStateMessage;
pub use health::NodeView;
pub use health::ZoneHealth;
pub use loadgen::DailyProfileLoadGenerator;
pub use loadgen::LoadGenerator;
pub use loadgen::RandomWalkLoadGenerator;
