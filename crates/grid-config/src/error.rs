// crates/grid-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: Error type for configuration loading and validation.
// Purpose: Make a missing or malformed configuration input a single,
//          fail-closed error the caller surfaces before anything starts.
// Dependencies: thiserror
// ============================================================================

/// Errors raised while loading or validating [`crate::GridConfig`].
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The configuration file was not valid TOML.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A required input was absent from both the environment and the file.
    #[error("missing required configuration value: {0}")]
    MissingRequired(String),
    /// A present value failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}
