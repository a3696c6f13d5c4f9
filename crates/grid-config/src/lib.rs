// crates/grid-config/src/lib.rs
// ============================================================================
// Crate: grid-config
// Description: Ambient configuration loader for the control plane's
//              startup inputs (spec.md §6).
// Purpose: Give the service binary one fail-closed place to resolve the
//          LLM oracle, registry, monitor, and named-contract-only
//          time-series/broker settings before constructing anything else.
// ============================================================================

//! ## Overview
//! Configuration is resolved from the environment first, falling back to a
//! dotted-key TOML file for anything the environment leaves unset. A
//! missing required value is a startup-fatal [`ConfigError`]; a missing
//! config file is not, since the environment may supply everything on its
//! own.

pub mod config;
pub mod error;

pub use config::GridConfig;
pub use config::MessageBrokerConfig;
pub use config::TimeSeriesStoreConfig;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::ENV_CONFIG_PATH;
pub use error::ConfigError;
