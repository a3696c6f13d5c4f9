// crates/grid-agent/src/catalog.rs
// ============================================================================
// Module: Tool Catalog Discovery
// Description: Fetches the flattened tool catalog from C12's HTTP surface
//              and presents it as an LLM-facing tool list, separately from
//              how a call is actually dispatched once chosen.
// Purpose: spec.md §4.9: the agent discovers what exists over HTTP (the
//          same view any client of C12 gets) but still invokes in-process
//          through the dispatcher it shares an address space with.
// Dependencies: grid-contract, reqwest, serde_json
// ============================================================================

use std::sync::RwLock;

use grid_contract::FlattenedTool;
use grid_contract::SafetyClass;
use grid_contract::ToolDescriptor;
use grid_contract::ToolName;

use crate::error::AgentError;

/// Last-resort cap mirrored from `grid_registry::ACTUATOR_VIEW_FALLBACK_CAP`
/// for the agent's own actuator-only view, used when the escalation
/// directive's tool view would otherwise be empty.
const ACTUATOR_VIEW_FALLBACK_CAP: usize = 10;

/// The agent's cached view of C4's flattened tool catalog, rebuilt by
/// [`ToolCatalog::refresh`].
pub struct ToolCatalog {
    http: reqwest::Client,
    registry_url: String,
    entries: RwLock<Vec<FlattenedTool>>,
}

impl ToolCatalog {
    #[must_use]
    pub fn new(registry_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), registry_url: registry_url.into(), entries: RwLock::new(Vec::new()) }
    }

    /// Fetches `GET {registry_url}/tools` and replaces the cached catalog.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Discovery`] on a transport failure or a
    /// response this client cannot parse.
    pub async fn refresh(&self) -> Result<(), AgentError> {
        let url = format!("{}/tools", self.registry_url.trim_end_matches('/'));
        let response = self.http.get(&url).send().await.map_err(|err| AgentError::Discovery(err.to_string()))?;
        let tools: Vec<FlattenedTool> =
            response.json().await.map_err(|err| AgentError::Discovery(err.to_string()))?;
        *self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner) = tools;
        Ok(())
    }

    /// Every discovered tool, presented as an LLM-facing descriptor under
    /// its flattened external name.
    #[must_use]
    pub fn full_view(&self) -> Vec<ToolDescriptor> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(as_descriptor)
            .collect()
    }

    /// The actuator-only filtered view used during escalations (spec.md
    /// §4.9), falling back to a small prefix of the full view if the
    /// filter yields nothing.
    #[must_use]
    pub fn actuator_view(&self) -> Vec<ToolDescriptor> {
        let entries = self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let filtered: Vec<ToolDescriptor> =
            entries.iter().filter(|e| e.safety_class.is_actuation()).map(as_descriptor).collect();
        if filtered.is_empty() {
            entries.iter().take(ACTUATOR_VIEW_FALLBACK_CAP).map(as_descriptor).collect()
        } else {
            filtered
        }
    }

    /// The safety class published for a flattened external name, if it is
    /// still in the cached catalog.
    #[must_use]
    pub fn safety_class_of(&self, external_name: &str) -> Option<SafetyClass> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .find(|e| e.external_name == external_name)
            .map(|e| e.safety_class)
    }

    /// Replaces the cached catalog directly, bypassing HTTP discovery.
    /// Used by tests and by callers wiring a known-good catalog snapshot
    /// ahead of a live registry being reachable.
    pub(crate) fn replace(&self, entries: Vec<FlattenedTool>) {
        *self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner) = entries;
    }

    /// Number of tools currently cached, for diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn as_descriptor(entry: &FlattenedTool) -> ToolDescriptor {
    ToolDescriptor {
        name: ToolName::from(entry.external_name.as_str()),
        description: entry.description.clone(),
        input_schema: entry.input_schema.clone(),
        output_schema: serde_json::json!({"type": "object"}),
        safety_class: entry.safety_class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, safety_class: SafetyClass) -> FlattenedTool {
        FlattenedTool {
            external_name: name.to_string(),
            server_id: "circuit_breaker-zone1-ab12".to_string(),
            original_name: "control".to_string(),
            description: "test tool".to_string(),
            safety_class,
            input_schema: serde_json::json!({}),
        }
    }

    #[test]
    fn actuator_view_excludes_read_only_entries() {
        let catalog = ToolCatalog::new("http://localhost:9000");
        catalog.replace(vec![sample("a_control", SafetyClass::MediumRisk), sample("a_get_status", SafetyClass::ReadOnly)]);
        let view = catalog.actuator_view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].name.0, "a_control");
    }

    #[test]
    fn actuator_view_falls_back_to_a_prefix_when_nothing_is_actuation() {
        let catalog = ToolCatalog::new("http://localhost:9000");
        catalog.replace(vec![sample("a_get_status", SafetyClass::ReadOnly)]);
        let view = catalog.actuator_view();
        assert_eq!(view.len(), 1);
    }
}
