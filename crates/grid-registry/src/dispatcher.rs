// crates/grid-registry/src/dispatcher.rs
// ============================================================================
// Module: Tool Dispatcher (C6)
// Description: Builds the flat, namespaced tool catalog the strategic agent
//              discovers, and routes an external tool-call name back to a
//              live endpoint instance.
// Purpose: Decouple "what the registry knows about" (descriptors) from
//          "what is actually callable right now" (live `Endpoint` handles),
//          so a stale or crashed endpoint degrades to a structured error
//          instead of a panic.
// Dependencies: grid-contract, crate::{registry, endpoint, server}
// ============================================================================

//! ## Overview
//! [`ToolDispatcher`] rebuilds its catalog from [`Registry::flatten_tools`]
//! on [`ToolDispatcher::refresh`] (spec.md §4.6's "on agent bootstrap"), then
//! answers two questions: what tools exist (full catalog, or the
//! actuator-only filtered view used during escalations), and how to invoke
//! one by its flattened external name. Invocation never panics: an unknown
//! name or a missing live endpoint both become an `{"error": ...}` payload.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use grid_contract::external_tool_name;
use grid_contract::ToolDescriptor;
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::registry::Registry;
use crate::server::ServerRecord;
use crate::ServerId;

/// Last-resort cap applied to the actuator-only view when the safety-class
/// filter yields nothing (spec.md §4.6).
pub const ACTUATOR_VIEW_FALLBACK_CAP: usize = 10;

/// One entry in the flattened catalog: the descriptor as published, plus
/// where to route an invocation under its external name.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// The flattened external name (`<server_name>_<tool_name>`,
    /// normalized).
    pub external_name: String,
    /// The owning server's id, for routing.
    pub server_id: ServerId,
    /// The tool's original name, as the endpoint itself knows it.
    pub original_name: String,
    /// The published descriptor (schema, safety class, description).
    pub descriptor: ToolDescriptor,
}

/// Builds and serves the flattened tool catalog, and routes invocations to
/// live endpoint instances.
pub struct ToolDispatcher {
    catalog: RwLock<Vec<CatalogEntry>>,
    live_endpoints: RwLock<HashMap<ServerId, Arc<dyn Endpoint>>>,
}

impl ToolDispatcher {
    /// Builds an empty dispatcher; call [`Self::refresh`] to populate its
    /// catalog from a registry.
    #[must_use]
    pub fn new() -> Self {
        Self { catalog: RwLock::new(Vec::new()), live_endpoints: RwLock::new(HashMap::new()) }
    }

    /// Registers a live, in-process endpoint instance under `id`, so that a
    /// later invocation of one of its tools can actually be routed. This is
    /// distinct from `registry`'s descriptor-only bookkeeping: a server can
    /// be known to the registry (e.g. after a restart loaded its snapshot)
    /// without a live instance yet being registered here.
    pub fn register_live(&self, id: ServerId, endpoint: Arc<dyn Endpoint>) {
        self.live_endpoints.write().unwrap_or_else(std::sync::PoisonError::into_inner).insert(id, endpoint);
    }

    /// Removes a live endpoint instance (e.g. on unregister).
    pub fn unregister_live(&self, id: &ServerId) {
        self.live_endpoints.write().unwrap_or_else(std::sync::PoisonError::into_inner).remove(id);
    }

    /// Rebuilds the flattened catalog from `registry`'s currently active
    /// endpoints (spec.md §4.6's "on agent bootstrap" step; callers may also
    /// invoke this on a later re-discovery).
    pub fn refresh(&self, registry: &Registry) {
        let flattened = registry.flatten_tools();
        let by_server: HashMap<ServerId, ServerRecord> = registry
            .list(&crate::server::ServerFilter::default())
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();

        let entries = flattened
            .into_iter()
            .map(|(server_id, descriptor)| {
                let server_name =
                    by_server.get(&server_id).map_or_else(|| server_id.to_string(), |r| r.id.to_string());
                CatalogEntry {
                    external_name: external_tool_name(&server_name, &descriptor.name),
                    server_id,
                    original_name: descriptor.name.0.clone(),
                    descriptor,
                }
            })
            .collect();
        *self.catalog.write().unwrap_or_else(std::sync::PoisonError::into_inner) = entries;
    }

    /// The full flattened catalog, for free-form queries (spec.md §4.9's
    /// "full catalog for free-form queries").
    #[must_use]
    pub fn full_catalog(&self) -> Vec<CatalogEntry> {
        self.catalog.read().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// The actuator-only filtered view used during escalations (spec.md
    /// §4.6): entries whose safety class is an actuation, or whose
    /// description mentions "actuate". Falls back to the first
    /// [`ACTUATOR_VIEW_FALLBACK_CAP`] entries of the full catalog if the
    /// filter yields nothing.
    #[must_use]
    pub fn actuator_tools(&self) -> Vec<CatalogEntry> {
        let catalog = self.catalog.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let filtered: Vec<CatalogEntry> = catalog
            .iter()
            .filter(|entry| {
                entry.descriptor.safety_class.is_actuation()
                    || entry.descriptor.description.to_ascii_lowercase().contains("actuate")
            })
            .cloned()
            .collect();
        if filtered.is_empty() {
            catalog.iter().take(ACTUATOR_VIEW_FALLBACK_CAP).cloned().collect()
        } else {
            filtered
        }
    }

    /// Invokes `external_name` with `arguments`. Never panics: an unknown
    /// name, a missing live endpoint, or an endpoint-level failure all
    /// become a `{"error": ...}` JSON payload rather than propagating as an
    /// error type, matching spec.md §4.6's contract for the agent's
    /// tool-use loop.
    #[must_use]
    pub fn invoke(&self, external_name: &str, arguments: Value) -> Value {
        let entry = {
            let catalog = self.catalog.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            catalog.iter().find(|e| e.external_name == external_name).cloned()
        };
        let Some(entry) = entry else {
            return serde_json::json!({"error": format!("unknown tool: {external_name}")});
        };

        let endpoint = {
            let live = self.live_endpoints.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            live.get(&entry.server_id).cloned()
        };
        let Some(endpoint) = endpoint else {
            return serde_json::json!({"error": "no_live_server", "server_id": entry.server_id.to_string()});
        };

        match endpoint.invoke(&entry.original_name, arguments) {
            Ok(value) => value,
            Err(err) => serde_json::json!({"error": err.to_string()}),
        }
    }

    /// Resolves an external name back to its owning server id and original
    /// tool name, without invoking it. Used by the guardian gate, which
    /// needs to know which device/zone a pending actuator call targets
    /// before deciding whether to allow it.
    #[must_use]
    pub fn resolve(&self, external_name: &str) -> Option<(ServerId, String)> {
        let catalog = self.catalog.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        catalog.iter().find(|e| e.external_name == external_name).map(|e| (e.server_id.clone(), e.original_name.clone()))
    }
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use grid_contract::SafetyClass;
    use grid_contract::ToolName;
    use grid_core::SimulationFacade;
    use grid_core::ZoneId;

    use super::*;
    use crate::actuator::Actuator;
    use crate::actuator::ActuatorKind;
    use crate::server::Domain;
    use crate::server::Tier;

    fn record_for(id: &str, tools: Vec<ToolDescriptor>) -> ServerRecord {
        ServerRecord {
            id: ServerId::from(id),
            kind: "circuit_breaker".to_string(),
            tier: Tier::Actuation,
            domain: Domain::power_grid(),
            zone: Some(ZoneId::Zone1),
            tools,
            status: crate::server::EndpointStatus::Active,
            registered_at: grid_core::Timestamp::now(),
            last_heartbeat: grid_core::Timestamp::now(),
        }
    }

    fn breaker_tools() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor {
                name: ToolName::from("control"),
                description: "Actuates a breaker".to_string(),
                input_schema: serde_json::json!({}),
                output_schema: serde_json::json!({}),
                safety_class: SafetyClass::MediumRisk,
            },
            ToolDescriptor {
                name: ToolName::from("get_status"),
                description: "Reads status".to_string(),
                input_schema: serde_json::json!({}),
                output_schema: serde_json::json!({}),
                safety_class: SafetyClass::ReadOnly,
            },
        ]
    }

    #[test]
    fn refresh_builds_flattened_external_names() {
        let registry = Registry::new();
        registry.register(record_for("circuit_breaker-zone1-ab12", breaker_tools())).unwrap();
        let dispatcher = ToolDispatcher::new();
        dispatcher.refresh(&registry);
        let catalog = dispatcher.full_catalog();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.iter().any(|e| e.external_name == "circuit_breaker-zone1-ab12_control"));
    }

    #[test]
    fn actuator_tools_excludes_read_only_entries() {
        let registry = Registry::new();
        registry.register(record_for("circuit_breaker-zone1-ab12", breaker_tools())).unwrap();
        let dispatcher = ToolDispatcher::new();
        dispatcher.refresh(&registry);
        let actuator_view = dispatcher.actuator_tools();
        assert_eq!(actuator_view.len(), 1);
        assert!(actuator_view[0].external_name.ends_with("_control"));
    }

    #[test]
    fn invoke_with_no_live_endpoint_returns_no_live_server_stub() {
        let registry = Registry::new();
        registry.register(record_for("circuit_breaker-zone1-ab12", breaker_tools())).unwrap();
        let dispatcher = ToolDispatcher::new();
        dispatcher.refresh(&registry);
        let result = dispatcher.invoke("circuit_breaker-zone1-ab12_control", serde_json::json!({}));
        assert_eq!(result["error"], "no_live_server");
    }

    #[test]
    fn invoke_unknown_tool_name_is_a_structured_error_not_a_panic() {
        let dispatcher = ToolDispatcher::new();
        let result = dispatcher.invoke("nonexistent_tool", serde_json::json!({}));
        assert!(result["error"].as_str().unwrap().contains("unknown tool"));
    }

    #[test]
    fn invoke_routes_to_live_endpoint_and_executes() {
        let registry = Registry::new();
        let record = record_for("circuit_breaker-zone1-ab12", breaker_tools());
        let id = record.id.clone();
        registry.register(record).unwrap();
        let dispatcher = ToolDispatcher::new();
        dispatcher.refresh(&registry);

        let facade = Arc::new(StdMutex::new(SimulationFacade::with_canonical_case()));
        let actuator = Arc::new(Actuator::new(ActuatorKind::CircuitBreaker, ZoneId::Zone1, facade));
        dispatcher.register_live(id, actuator);

        let result =
            dispatcher.invoke("circuit_breaker-zone1-ab12_get_status", serde_json::json!({"id": "line0"}));
        assert!(result.get("error").is_none());
        assert!(result.get("in_service").is_some());
    }

    #[test]
    fn resolve_returns_server_id_and_original_name() {
        let registry = Registry::new();
        registry.register(record_for("circuit_breaker-zone1-ab12", breaker_tools())).unwrap();
        let dispatcher = ToolDispatcher::new();
        dispatcher.refresh(&registry);
        let (server_id, original) = dispatcher.resolve("circuit_breaker-zone1-ab12_control").unwrap();
        assert_eq!(server_id, ServerId::from("circuit_breaker-zone1-ab12"));
        assert_eq!(original, "control");
    }
}
