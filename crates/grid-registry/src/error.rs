// crates/grid-registry/src/error.rs
// ============================================================================
// Module: Registry Errors
// ============================================================================

use thiserror::Error;

/// Errors reported by the registry store, endpoints, and dispatcher.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// No server is registered under the given id.
    #[error("no server registered with id {0}")]
    UnknownServer(String),
    /// No tool is registered under the given external name.
    #[error("no tool registered with external name {0}")]
    UnknownTool(String),
    /// A component referenced by an endpoint does not exist in C1.
    #[error("unknown device id: {0}")]
    UnknownDevice(String),
    /// A device kind was asked to perform an action outside its fixed
    /// valid-action set.
    #[error("action '{action}' is not valid for device kind '{kind}'")]
    InvalidAction { kind: String, action: String },
    /// The underlying simulation facade rejected the mutation.
    #[error("facade error: {0}")]
    Facade(String),
    /// Snapshot persistence failed (write or rename).
    #[error("registry snapshot persistence failed: {0}")]
    Persistence(String),
}

impl From<grid_core::FacadeError> for RegistryError {
    fn from(err: grid_core::FacadeError) -> Self {
        Self::Facade(err.to_string())
    }
}
