// crates/grid-providers/src/config.rs
// ============================================================================
// Module: Oracle Configuration
// Description: Environment-variable loader for the LLM oracle endpoint,
//              credential, and per-role model identifiers.
// Purpose: Give the guardian (C8) and strategic agent (C9) a single,
//          fail-closed way to resolve which oracle and model to call.
// Dependencies: none beyond std
// ============================================================================

//! ## Overview
//! [`OracleConfig::from_env`] resolves the endpoint, credential, and model
//! identifiers named in spec.md §6 from environment variables, mirroring
//! this workspace's other env-var-driven provider configuration. A missing
//! endpoint or credential is a deploy-time misconfiguration rather than a
//! per-request condition, so it is reported eagerly rather than deferred to
//! the first oracle call.

use crate::http::HttpLlmConfig;

/// Environment variable names this loader reads.
pub const ENV_ENDPOINT: &str = "GRID_LLM_ENDPOINT";
pub const ENV_CREDENTIAL: &str = "GRID_LLM_CREDENTIAL";
pub const ENV_STRATEGIC_MODEL: &str = "GRID_LLM_STRATEGIC_MODEL";
pub const ENV_GUARDIAN_MODEL: &str = "GRID_LLM_GUARDIAN_MODEL";
pub const ENV_ZONE_MODEL_PREFIX: &str = "GRID_LLM_ZONE_MODEL_";

/// Errors raised while resolving oracle configuration from the environment.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A required environment variable was absent or empty.
    #[error("missing required environment variable: {0}")]
    MissingRequired(String),
}

/// Resolved oracle configuration: where to call, and which model
/// identifier to use for each role.
///
/// # Invariants
/// - `strategic_model` and `guardian_model` are always populated; a
///   missing zone-specific model falls back to `strategic_model`.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
    /// Transport configuration (endpoint, credential, timeout, size limit).
    pub http: HttpLlmConfig,
    /// Model identifier used by the strategic agent (C9).
    pub strategic_model: String,
    /// Model identifier used by the safety guardian (C8).
    pub guardian_model: String,
    /// Per-zone model overrides, keyed by zone id (e.g. `"zone1"`).
    pub zone_models: std::collections::BTreeMap<String, String>,
}

impl OracleConfig {
    /// Resolves configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequired`] if the endpoint or
    /// credential is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = read_required(ENV_ENDPOINT)?;
        let credential = read_required(ENV_CREDENTIAL)?;
        let strategic_model =
            std::env::var(ENV_STRATEGIC_MODEL).unwrap_or_else(|_| "strategic-default".to_string());
        let guardian_model =
            std::env::var(ENV_GUARDIAN_MODEL).unwrap_or_else(|_| "guardian-default".to_string());
        let zone_models = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_ZONE_MODEL_PREFIX).map(|zone| (zone.to_ascii_lowercase(), value))
            })
            .collect();
        Ok(Self {
            http: HttpLlmConfig { endpoint, credential, ..HttpLlmConfig::default() },
            strategic_model,
            guardian_model,
            zone_models,
        })
    }

    /// Returns the model identifier to use for `zone`, falling back to
    /// [`Self::strategic_model`] when no zone-specific override is set.
    #[must_use]
    pub fn model_for_zone(&self, zone: &str) -> &str {
        self.zone_models.get(zone).map_or(self.strategic_model.as_str(), String::as_str)
    }
}

fn read_required(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingRequired(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_for_zone_falls_back_to_strategic_model() {
        let config = OracleConfig {
            http: HttpLlmConfig::default(),
            strategic_model: "strategic-default".to_string(),
            guardian_model: "guardian-default".to_string(),
            zone_models: std::collections::BTreeMap::new(),
        };
        assert_eq!(config.model_for_zone("zone1"), "strategic-default");
    }

    #[test]
    fn model_for_zone_uses_override_when_present() {
        let mut zone_models = std::collections::BTreeMap::new();
        zone_models.insert("zone2".to_string(), "zone2-specialist".to_string());
        let config = OracleConfig {
            http: HttpLlmConfig::default(),
            strategic_model: "strategic-default".to_string(),
            guardian_model: "guardian-default".to_string(),
            zone_models,
        };
        assert_eq!(config.model_for_zone("zone2"), "zone2-specialist");
        assert_eq!(config.model_for_zone("zone1"), "strategic-default");
    }

    #[test]
    fn read_required_rejects_empty_value() {
        assert_eq!(
            read_required("GRID_LLM_ENDPOINT_DEFINITELY_UNSET_XYZ"),
            Err(ConfigError::MissingRequired("GRID_LLM_ENDPOINT_DEFINITELY_UNSET_XYZ".to_string()))
        );
    }
}
