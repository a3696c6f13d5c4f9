// crates/grid-registry/src/endpoint.rs
// ============================================================================
// Module: Endpoint Abstraction (C5)
// Description: The shared trait every sensor, actuator, and zone
//              coordinator endpoint implements, giving C6 one uniform
//              invocation entry point regardless of concrete kind.
// Purpose: Let the dispatcher invoke any endpoint's tool by name without
//          matching on concrete type.
// Dependencies: grid-contract, serde_json
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use grid_contract::ToolDescriptor;
use grid_core::SimulationFacade;

use crate::error::RegistryError;

/// A handle to the single shared simulation facade (C1), guarded by one
/// mutex so every endpoint can read or mutate it without racing the
/// monitoring loop or other endpoints.
pub type SharedFacade = Arc<Mutex<SimulationFacade>>;

/// The uniform entry point C6's dispatcher calls after resolving an
/// external tool name back to a live endpoint instance.
///
/// # Invariants
/// - `invoke` never panics; every failure becomes a `Result::Err` so the
///   dispatcher can turn it into the structured `{error: …}` payload
///   spec.md §4.6 requires instead of propagating a panic into the agent's
///   tool-use loop.
pub trait Endpoint: Send + Sync {
    /// The tool descriptors this endpoint advertises to the registry at
    /// registration time.
    fn tool_descriptors(&self) -> Vec<ToolDescriptor>;

    /// Invokes `tool_name` (the endpoint's own name, not the dispatcher's
    /// flattened external name) with `arguments`, returning the raw JSON
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the tool name is unrecognized by this
    /// endpoint, the arguments are malformed, or the underlying facade
    /// operation fails.
    fn invoke(&self, tool_name: &str, arguments: serde_json::Value) -> Result<serde_json::Value, RegistryError>;
}

pub(crate) fn lock_facade(facade: &SharedFacade) -> std::sync::MutexGuard<'_, SimulationFacade> {
    facade.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub(crate) fn arg_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, RegistryError> {
    arguments
        .get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| RegistryError::UnknownDevice(format!("missing or non-string argument '{key}'")))
}

pub(crate) fn arg_f64(arguments: &serde_json::Value, key: &str) -> Result<f64, RegistryError> {
    arguments
        .get(key)
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| RegistryError::UnknownDevice(format!("missing or non-numeric argument '{key}'")))
}
