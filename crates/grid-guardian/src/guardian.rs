// crates/grid-guardian/src/guardian.rs
// ============================================================================
// Module: Guardian
// Description: Stateless policy-oracle gate (C8): normalizes a proposed
//              command, asks an LLM oracle for a verdict, parses the
//              reply tolerantly, records it, and publishes it.
// Purpose: The one seam every actuation the strategic agent proposes
//          must pass through before C6 ever sees it.
// Dependencies: grid-bus, grid-core, grid-providers, crate::command,
//               crate::verdict
// ============================================================================

//! ## Overview
//! Grounded on `decision-gate-mcp/src/policy.rs` and
//! `decision-gate-core/src/interfaces/mod.rs`'s `PolicyDecider`: a
//! narrow, swappable decision seam with a deterministic fail-closed
//! default. Here the "policy engine" is an LLM oracle instead of static
//! rules, so the fail-closed default covers transport failures and
//! unparseable replies rather than config errors.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use grid_bus::EventBus;
use grid_core::telemetry::Metrics;
use grid_providers::ChatCompletionRequest;
use grid_providers::ChatMessage;
use grid_providers::LlmClient;

use crate::command::CommandRecord;
use crate::verdict::GuardianVerdict;

/// The number of most-recent verdicts the guardian keeps queryable.
pub const VERDICT_HISTORY_CAPACITY: usize = 50;

const SAFETY_SYSTEM_PROMPT: &str = "You are the safety guardian for an electrical \
transmission grid control system. You will be shown one proposed actuation command \
and a short description of current grid conditions. Decide whether executing this \
command as described is safe. Respond with a single JSON object with the fields \
safe (boolean), risk_level (one of LOW, MEDIUM, HIGH, CRITICAL), reasoning (string), \
and conditions (array of strings naming anything that must hold for the action to \
remain safe). Default to unsafe when you are uncertain.";

/// A guardian verdict paired with the command it was issued for, as kept
/// in the ring buffer and published on `guardian_event`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordedVerdict {
    pub command_summary: String,
    pub verdict: GuardianVerdict,
}

/// The Safety Guardian: stateless aside from its verdict history ring
/// buffer and event bus handle.
pub struct Guardian {
    oracle: Arc<dyn LlmClient>,
    model: String,
    bus: Arc<EventBus>,
    metrics: Arc<dyn Metrics>,
    history: Mutex<VecDeque<RecordedVerdict>>,
}

impl Guardian {
    /// Builds a guardian that queries `oracle` using `model` for every
    /// verdict and publishes each one on `bus`.
    #[must_use]
    pub fn new(oracle: Arc<dyn LlmClient>, model: impl Into<String>, bus: Arc<EventBus>, metrics: Arc<dyn Metrics>) -> Self {
        Self { oracle, model: model.into(), bus, metrics, history: Mutex::new(VecDeque::with_capacity(VERDICT_HISTORY_CAPACITY)) }
    }

    /// Evaluates a raw proposed command: normalizes it, asks the oracle,
    /// parses the reply, records it, and publishes it. Never returns an
    /// error — any failure degrades to [`GuardianVerdict::fail_closed`].
    pub async fn evaluate(&self, raw_command: &serde_json::Value) -> GuardianVerdict {
        let record = CommandRecord::from_raw(raw_command);
        let verdict = self.ask_oracle(&record).await;
        self.remember(&record, &verdict);
        self.publish(&record, &verdict);
        verdict
    }

    async fn ask_oracle(&self, record: &CommandRecord) -> GuardianVerdict {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: SAFETY_SYSTEM_PROMPT.to_string(), tool_calls: Vec::new(), tool_call_id: None },
                ChatMessage { role: "user".to_string(), content: describe(record), tool_calls: Vec::new(), tool_call_id: None },
            ],
            tools: Vec::new(),
        };
        match self.oracle.complete(request).await {
            Ok(response) => GuardianVerdict::parse(&response.content),
            Err(_err) => {
                self.metrics.record(grid_core::telemetry::MetricEvent { name: "guardian.oracle_call", outcome: "failure" });
                GuardianVerdict::fail_closed()
            }
        }
    }

    fn remember(&self, record: &CommandRecord, verdict: &GuardianVerdict) {
        let mut history = self.history.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if history.len() == VERDICT_HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(RecordedVerdict { command_summary: describe(record), verdict: verdict.clone() });
    }

    fn publish(&self, record: &CommandRecord, verdict: &GuardianVerdict) {
        let payload = serde_json::json!({
            "command": describe(record),
            "safe": verdict.safe,
            "risk_level": verdict.risk_level,
            "reasoning": verdict.reasoning,
            "conditions": verdict.conditions,
        });
        let _ = self.bus.publish_value("guardian_event", payload);
    }

    /// The most recent verdicts, newest last, up to
    /// [`VERDICT_HISTORY_CAPACITY`].
    #[must_use]
    pub fn recent_verdicts(&self) -> Vec<RecordedVerdict> {
        self.history.lock().unwrap_or_else(std::sync::PoisonError::into_inner).iter().cloned().collect()
    }
}

fn describe(record: &CommandRecord) -> String {
    format!(
        "action={} target={} parameters={} context={}",
        record.action, record.target, record.parameters, record.context
    )
}

#[cfg(test)]
mod tests {
    use grid_core::telemetry::NoopMetrics;
    use grid_providers::ChatCompletionResponse;
    use grid_providers::MockLlmClient;

    use super::*;

    fn guardian(oracle: impl LlmClient + 'static) -> Guardian {
        Guardian::new(Arc::new(oracle), "guardian-model", Arc::new(EventBus::new()), Arc::new(NoopMetrics))
    }

    #[tokio::test]
    async fn vetoes_an_unsafe_command_with_high_or_critical_risk() {
        let oracle = MockLlmClient::always_text(
            r#"{"safe": false, "risk_level": "CRITICAL", "reasoning": "opens every breaker in the generation zone", "conditions": ["deny"]}"#,
        );
        let guardian = guardian(oracle);
        let command = serde_json::json!({
            "action": "emergency_shutdown",
            "target": "zone1",
            "parameters": {"scope": "all_breakers"},
            "context": "routine load balancing",
        });
        let verdict = guardian.evaluate(&command).await;
        assert!(!verdict.safe);
        assert!(matches!(verdict.risk_level, crate::verdict::RiskLevel::High | crate::verdict::RiskLevel::Critical));
    }

    #[tokio::test]
    async fn oracle_transport_failure_fails_closed() {
        struct AlwaysErrors;
        #[async_trait::async_trait]
        impl LlmClient for AlwaysErrors {
            async fn complete(&self, _request: ChatCompletionRequest) -> Result<ChatCompletionResponse, grid_providers::LlmError> {
                Err(grid_providers::LlmError::Transport("connection refused".to_string()))
            }
        }
        let guardian = guardian(AlwaysErrors);
        let verdict = guardian.evaluate(&serde_json::json!({"action": "trip", "target": "line1"})).await;
        assert_eq!(verdict, GuardianVerdict::fail_closed());
    }

    #[tokio::test]
    async fn history_is_capped_at_fifty_and_keeps_the_most_recent() {
        let guardian = guardian(MockLlmClient::always_text("safe"));
        for i in 0 .. VERDICT_HISTORY_CAPACITY + 5 {
            let command = serde_json::json!({"action": "control", "target": format!("line{i}")});
            guardian.evaluate(&command).await;
        }
        let history = guardian.recent_verdicts();
        assert_eq!(history.len(), VERDICT_HISTORY_CAPACITY);
        assert!(history.last().unwrap().command_summary.contains(&format!("line{}", VERDICT_HISTORY_CAPACITY + 4)));
    }

    #[tokio::test]
    async fn every_verdict_is_published_to_guardian_event() {
        let bus = Arc::new(EventBus::new());
        let mut subscription = bus.subscribe("guardian_event");
        let guardian = Guardian::new(Arc::new(MockLlmClient::always_text("safe")), "guardian-model", Arc::clone(&bus), Arc::new(NoopMetrics));
        guardian.evaluate(&serde_json::json!({"action": "trip", "target": "line1"})).await;
        let message = subscription.recv().await.expect("a guardian_event message");
        assert_eq!(message["command"].as_str().unwrap().contains("line1"), true);
    }
}
