// crates/grid-agent/src/agent.rs
// ============================================================================
// Module: Strategic Agent
// Description: The tool-using LLM collaborator (C9): answers free-form
//              operator queries and, on escalation, synthesizes and acts
//              on a directive the monitoring loop hands it.
// Purpose: Bridge the zone engines' local, deterministic decisions and a
//          human operator's natural-language interface, while every
//          actuation it proposes is still gated by the guardian (C8).
// Dependencies: grid-bus, grid-contract, grid-core, grid-guardian,
//               grid-providers, grid-registry, grid-store
// ============================================================================

//! ## Overview
//! [`StrategicAgent::query`] runs a bounded tool-use loop: it hands the
//! oracle a context block built from [`grid_store::ContextMemory`] plus
//! either the full tool catalog or the actuator-only view (escalations
//! only), executes whatever tools the model requests — routing
//! actuations through [`grid_guardian::Guardian`] first — and stops once
//! the model answers with plain text or the round budget is exhausted.

use std::sync::Arc;

use grid_bus::EventBus;
use grid_contract::SafetyClass;
use grid_core::telemetry::Metrics;
use grid_core::telemetry::MetricEvent;
use grid_guardian::Guardian;
use grid_providers::ChatCompletionRequest;
use grid_providers::ChatMessage;
use grid_providers::LlmClient;
use grid_providers::ToolCallRequest;
use grid_registry::ToolDispatcher;
use grid_store::AgentDecision;
use grid_store::ContextMemory;

use crate::catalog::ToolCatalog;
use crate::error::AgentError;

/// Hard cap on tool-use rounds in a single [`StrategicAgent::query`] call
/// (spec.md §4.9).
pub const MAX_TOOL_ROUNDS: usize = 10;

const SYSTEM_PROMPT: &str = "You are the strategic control agent for an electrical \
transmission grid. You have tools to inspect and actuate grid equipment. Use them to \
answer the operator's question or resolve the situation described. When an escalation \
directive names a concrete first action, execute it before elaborating.";

/// The strategic agent: holds the oracle handle, durable context memory,
/// the guardian gate, and everything needed to discover and invoke tools.
pub struct StrategicAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    context: Arc<ContextMemory>,
    guardian: Arc<Guardian>,
    dispatcher: Arc<ToolDispatcher>,
    catalog: ToolCatalog,
    bus: Arc<EventBus>,
    metrics: Arc<dyn Metrics>,
}

impl StrategicAgent {
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        context: Arc<ContextMemory>,
        guardian: Arc<Guardian>,
        dispatcher: Arc<ToolDispatcher>,
        registry_url: impl Into<String>,
        bus: Arc<EventBus>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            context,
            guardian,
            dispatcher,
            catalog: ToolCatalog::new(registry_url),
            bus,
            metrics,
        }
    }

    /// Fetches the flattened tool catalog from the registry's HTTP
    /// surface (spec.md §4.9's discovery step). Call once at boot and
    /// again after any topology change (new endpoints registered).
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Discovery`] on a transport failure.
    pub async fn discover_tools(&self) -> Result<(), AgentError> {
        self.catalog.refresh().await
    }

    /// Answers `user_message`. When `escalation` is true, the model is
    /// shown only the actuator-only tool view and is expected to act
    /// rather than merely describe.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Llm`] or [`AgentError::Store`] if the
    /// underlying oracle or context memory fails outright (as opposed to
    /// returning a verdict or answer the loop can act on).
    pub async fn query(&self, user_message: &str, escalation: bool) -> Result<String, AgentError> {
        self.publish_log("analyzing", user_message);

        let context_block = self.build_context_block()?;
        let tools = if escalation { self.catalog.actuator_view() } else { self.catalog.full_view() };

        let mut messages = vec![
            ChatMessage { role: "system".to_string(), content: format!("{SYSTEM_PROMPT}\n\n{context_block}"), tool_calls: Vec::new(), tool_call_id: None },
            ChatMessage { role: "user".to_string(), content: user_message.to_string(), tool_calls: Vec::new(), tool_call_id: None },
        ];

        let mut actions_taken = Vec::new();
        let mut final_text = None;

        for _round in 0 .. MAX_TOOL_ROUNDS {
            let request = ChatCompletionRequest { model: self.model.clone(), messages: messages.clone(), tools: tools.clone() };
            let response = self.llm.complete(request).await?;

            if response.tool_calls.is_empty() {
                final_text = Some(response.content);
                break;
            }

            self.publish_log("tool_call", &format!("{} tool call(s) requested", response.tool_calls.len()));
            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: response.content,
                tool_calls: response.tool_calls.clone(),
                tool_call_id: None,
            });

            for call in &response.tool_calls {
                let result = self.execute_tool_call(call).await;
                actions_taken.push(format!("{}({})", call.tool_name, call.arguments));
                messages.push(ChatMessage {
                    role: "tool".to_string(),
                    content: result.to_string(),
                    tool_calls: Vec::new(),
                    tool_call_id: Some(call.id.clone()),
                });
            }
        }

        let outcome = final_text.unwrap_or_else(|| {
            "Tool-use loop exhausted its round budget; see actions_taken for what was attempted.".to_string()
        });

        self.record_decision(user_message, &outcome, actions_taken)?;
        self.publish_log("decision", &outcome);
        Ok(outcome)
    }

    async fn execute_tool_call(&self, call: &ToolCallRequest) -> serde_json::Value {
        let is_actuation = self
            .catalog
            .safety_class_of(&call.tool_name)
            .map_or(false, SafetyClass::is_actuation);

        if is_actuation {
            let command = guardian_command_from_call(call);
            let verdict = self.guardian.evaluate(&command).await;
            if !verdict.safe {
                self.metrics.record(MetricEvent { name: "agent.guardian_veto", outcome: "denied" });
                return serde_json::json!({
                    "error": "guardian_denied",
                    "risk_level": verdict.risk_level,
                    "reasoning": verdict.reasoning,
                });
            }
        }

        self.dispatcher.invoke(&call.tool_name, call.arguments.clone())
    }

    fn build_context_block(&self) -> Result<String, AgentError> {
        let summary = self.context.get_context_summary()?;
        Ok(format!(
            "Context: {} prior decisions recorded. Most recent triggers: {}.",
            summary.decision_count,
            if summary.recent_triggers.is_empty() { "none".to_string() } else { summary.recent_triggers.join("; ") }
        ))
    }

    fn record_decision(&self, trigger: &str, outcome: &str, actions_taken: Vec<String>) -> Result<(), AgentError> {
        let decision = AgentDecision {
            id: uuid::Uuid::new_v4().to_string(),
            trigger: trigger.to_string(),
            reasoning: outcome.to_string(),
            actions_taken,
            outcome: outcome.to_string(),
            timestamp: grid_core::Timestamp::now(),
        };
        self.context.store_decision(&decision)?;
        Ok(())
    }

    fn publish_log(&self, level: &str, message: &str) {
        let payload = serde_json::json!({"level": level, "message": message});
        let _ = self.bus.publish_value("agent_log", payload);
    }
}

/// Builds the guardian-facing command from a tool-use call's arguments.
///
/// The real action verb and target device id live inside `call.arguments`
/// (e.g. `{"id": "line0", "action": "open"}`), not in the flattened
/// external tool name (`"breaker-zone1-ab12_control"`) — the guardian's
/// dict-shape/verb-scan normalization (spec.md §4.8) only has something to
/// normalize if it is handed those fields rather than the tool name twice.
fn guardian_command_from_call(call: &ToolCallRequest) -> serde_json::Value {
    let action = call.arguments.get("action").cloned().unwrap_or_else(|| serde_json::Value::String(call.tool_name.clone()));
    let target = call
        .arguments
        .get("id")
        .or_else(|| call.arguments.get("target"))
        .cloned()
        .unwrap_or_else(|| serde_json::Value::String(call.tool_name.clone()));
    let parameters = call.arguments.get("parameters").cloned().unwrap_or_else(|| call.arguments.clone());
    serde_json::json!({
        "action": action,
        "target": target,
        "parameters": parameters,
        "context": "strategic agent tool-use loop",
    })
}

#[cfg(test)]
mod tests {
    use grid_core::telemetry::NoopMetrics;
    use grid_core::SimulationFacade;
    use grid_core::ZoneId;
    use grid_providers::ChatCompletionResponse;
    use grid_providers::MockLlmClient;
    use grid_registry::Actuator;
    use grid_registry::ActuatorKind;
    use std::sync::Mutex as StdMutex;

    use super::*;

    fn wired_agent(oracle: impl LlmClient + 'static) -> StrategicAgent {
        let context = Arc::new(ContextMemory::open_in_memory().expect("open context memory"));
        let bus = Arc::new(EventBus::new());
        let guardian = Arc::new(Guardian::new(
            Arc::new(MockLlmClient::always_text("safe")),
            "guardian-model",
            Arc::clone(&bus),
            Arc::new(NoopMetrics),
        ));
        let dispatcher = Arc::new(ToolDispatcher::new());
        StrategicAgent::new(Arc::new(oracle), "strategic-model", context, guardian, dispatcher, "http://localhost:9000", bus, Arc::new(NoopMetrics))
    }

    #[test]
    fn guardian_command_uses_the_real_action_and_device_id_from_arguments() {
        let call = ToolCallRequest {
            id: "call1".to_string(),
            tool_name: "breaker-zone1-ab12_control".to_string(),
            arguments: serde_json::json!({"id": "line0", "action": "open"}),
        };
        let command = guardian_command_from_call(&call);
        assert_eq!(command["action"], "open");
        assert_eq!(command["target"], "line0");
    }

    #[tokio::test]
    async fn a_plain_text_answer_ends_the_loop_on_the_first_round() {
        let agent = wired_agent(MockLlmClient::always_text("All zones nominal."));
        let answer = agent.query("What is the grid status?", false).await.expect("query");
        assert_eq!(answer, "All zones nominal.");
    }

    #[tokio::test]
    async fn records_a_decision_in_context_memory_after_every_query() {
        let agent = wired_agent(MockLlmClient::always_text("Done."));
        agent.query("status?", false).await.expect("query");
        let summary = agent.context.get_context_summary().expect("summary");
        assert_eq!(summary.decision_count, 1);
    }

    #[tokio::test]
    async fn an_actuation_tool_call_is_vetoed_when_the_guardian_says_unsafe() {
        let bus = Arc::new(EventBus::new());
        let unsafe_guardian = Arc::new(Guardian::new(
            Arc::new(MockLlmClient::always_text(
                r#"{"safe": false, "risk_level": "CRITICAL", "reasoning": "too risky", "conditions": []}"#,
            )),
            "guardian-model",
            Arc::clone(&bus),
            Arc::new(NoopMetrics),
        ));
        let context = Arc::new(ContextMemory::open_in_memory().expect("open"));
        let facade = Arc::new(StdMutex::new(SimulationFacade::with_canonical_case()));
        let dispatcher = Arc::new(ToolDispatcher::new());
        let actuator = Arc::new(Actuator::new(ActuatorKind::CircuitBreaker, ZoneId::Zone1, facade));
        dispatcher.register_live(grid_registry::ServerId::from("breaker-zone1-ab12"), actuator);

        let oracle = MockLlmClient::new(vec![
            ChatCompletionResponse {
                content: String::new(),
                tool_calls: vec![ToolCallRequest {
                    id: "call1".to_string(),
                    tool_name: "breaker-zone1-ab12_control".to_string(),
                    arguments: serde_json::json!({"id": "line0", "action": "open"}),
                }],
            },
            ChatCompletionResponse { content: "Could not proceed; guardian denied the action.".to_string(), tool_calls: Vec::new() },
        ]);

        let agent = StrategicAgent::new(
            Arc::new(oracle),
            "strategic-model",
            context,
            unsafe_guardian,
            dispatcher,
            "http://localhost:9000",
            bus,
            Arc::new(NoopMetrics),
        );
        // Mark the tool as an actuation in the agent's cached catalog so the
        // veto path is exercised.
        agent
            .catalog
            .replace(vec![grid_contract::FlattenedTool {
                external_name: "breaker-zone1-ab12_control".to_string(),
                server_id: "breaker-zone1-ab12".to_string(),
                original_name: "control".to_string(),
                description: "Actuates a breaker".to_string(),
                safety_class: SafetyClass::MediumRisk,
                input_schema: serde_json::json!({}),
            }]);

        let answer = agent.query("open line0", true).await.expect("query");
        assert!(answer.contains("denied"));
    }
}
