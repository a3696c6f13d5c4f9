// crates/grid-registry/src/lib.rs
// ============================================================================
// Crate: grid-registry
// Description: Registry store (C4), endpoint abstractions (C5: sensor,
//              actuator), and the flat tool-catalog dispatcher (C6).
// Purpose: The one place every endpoint registers with, heartbeats against,
//          and is discovered and invoked through.
// ============================================================================

//! ## Overview
//! `grid-registry` owns three cooperating pieces: [`registry::Registry`]
//! (the server map with staleness and snapshot persistence), the
//! [`endpoint::Endpoint`] trait its sensor and actuator implementations
//! satisfy, and [`dispatcher::ToolDispatcher`] (the flattened external
//! catalog C9's tool-use loop calls through). Zone coordinator endpoints
//! (C7 instances) satisfy the same `Endpoint` trait from `grid-zone`, which
//! depends on this crate rather than the reverse.

pub mod actuator;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod registry;
pub mod sensor;
pub mod server;

pub use actuator::Actuator;
pub use actuator::ActuatorKind;
pub use dispatcher::CatalogEntry;
pub use dispatcher::ToolDispatcher;
pub use dispatcher::ACTUATOR_VIEW_FALLBACK_CAP;
pub use endpoint::Endpoint;
pub use endpoint::SharedFacade;
pub use error::RegistryError;
pub use grid_core::ServerId;
pub use registry::Registry;
pub use registry::STALE_AFTER_SECS;
pub use registry::SWEEP_INTERVAL_SECS;
pub use sensor::Sensor;
pub use sensor::SensorKind;
pub use server::mint_server_id;
pub use server::Domain;
pub use server::EndpointStatus;
pub use server::ServerFilter;
pub use server::ServerRecord;
pub use server::Tier;
