// crates/grid-providers/src/llm.rs
// ============================================================================
// Module: LLM Oracle Client
// Description: The trait and wire types shared by every LLM-backed
//              collaborator: the guardian's policy oracle (C8) and the
//              strategic agent's tool-use loop (C9).
// Purpose: Let C8/C9 depend on one abstraction instead of each inventing
//          its own HTTP plumbing, matching this workspace's "narrow trait
//          at the seam, pluggable implementation" pattern.
// Dependencies: async-trait, grid-contract
// ============================================================================

//! ## Overview
//! [`LlmClient`] is the seam: [`HttpLlmClient`] talks to a real chat
//! completion endpoint, [`MockLlmClient`] returns scripted responses for
//! tests and the demo boot sequence (spec.md §4.12's "mock vs real boot"
//! choice).

use async_trait::async_trait;
use grid_contract::ToolDescriptor;
use serde::Deserialize;
use serde::Serialize;

/// One turn in a chat-style conversation sent to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"system"`, `"user"`, `"assistant"`, or `"tool"`.
    pub role: String,
    /// Message text; empty when `tool_calls` carries the payload instead.
    pub content: String,
    /// Tool calls the assistant requested, if this is an assistant turn.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    /// The tool call id this message answers, if this is a tool-result
    /// turn.
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

/// A single tool invocation the model requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Opaque id correlating this request with its eventual tool result.
    pub id: String,
    /// The external tool name (spec.md §4.6's flattened namespace).
    pub tool_name: String,
    /// Arguments, as raw JSON.
    pub arguments: serde_json::Value,
}

/// A request to the oracle: conversation so far plus the tools currently
/// in scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier (strategic, per-zone, or guardian model, per
    /// spec.md §6).
    pub model: String,
    /// Conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may call this turn.
    pub tools: Vec<ToolDescriptor>,
}

/// The oracle's reply: either a final answer or a set of tool calls to
/// execute before the loop continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Final assistant text, if the model did not request tool calls.
    pub content: String,
    /// Tool calls requested by the model, if any.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
}

/// Errors reported by an [`LlmClient`].
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum LlmError {
    /// The request timed out.
    #[error("llm request timed out after {0}ms")]
    Timeout(u64),
    /// The transport failed (connection refused, DNS failure, TLS error).
    #[error("llm transport error: {0}")]
    Transport(String),
    /// The oracle returned a response this client could not parse.
    #[error("llm response malformed: {0}")]
    Malformed(String),
}

/// Abstraction over a chat-completion-style LLM oracle.
///
/// # Invariants
/// - Implementations never panic; every failure mode is an [`LlmError`]
///   variant so callers (the guardian, the agent's tool-use loop) can
///   apply spec.md §7's "LLM failure or timeout" policy uniformly.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends a chat completion request and awaits the oracle's reply.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on timeout, transport failure, or a response
    /// this client cannot parse.
    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError>;
}

/// A scripted [`LlmClient`] used by tests and the demo boot sequence.
/// Returns the next response from a fixed queue, cycling back to the
/// last response once the queue is exhausted.
pub struct MockLlmClient {
    responses: std::sync::Mutex<Vec<ChatCompletionResponse>>,
}

impl MockLlmClient {
    /// Builds a mock client that replays `responses` in order, repeating
    /// the final one for any call beyond the queue's length.
    #[must_use]
    pub fn new(responses: Vec<ChatCompletionResponse>) -> Self {
        Self { responses: std::sync::Mutex::new(responses) }
    }

    /// Builds a mock client that always returns a fixed final-text
    /// response with no tool calls.
    #[must_use]
    pub fn always_text(text: impl Into<String>) -> Self {
        Self::new(vec![ChatCompletionResponse { content: text.into(), tool_calls: Vec::new() }])
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _request: ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        let mut responses = self.responses.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if responses.len() > 1 {
            Ok(responses.remove(0))
        } else {
            Ok(responses.first().cloned().unwrap_or(ChatCompletionResponse {
                content: String::new(),
                tool_calls: Vec::new(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_replays_queued_responses_in_order() {
        let client = MockLlmClient::new(vec![
            ChatCompletionResponse { content: "first".to_string(), tool_calls: Vec::new() },
            ChatCompletionResponse { content: "second".to_string(), tool_calls: Vec::new() },
        ]);
        let request = ChatCompletionRequest {
            model: "guardian-model".to_string(),
            messages: Vec::new(),
            tools: Vec::new(),
        };
        let first = client.complete(request.clone()).await.unwrap();
        let second = client.complete(request).await.unwrap();
        assert_eq!(first.content, "first");
        assert_eq!(second.content, "second");
    }

    #[tokio::test]
    async fn always_text_repeats_forever() {
        let client = MockLlmClient::always_text("steady");
        let request = ChatCompletionRequest {
            model: "m".to_string(),
            messages: Vec::new(),
            tools: Vec::new(),
        };
        for _ in 0 .. 3 {
            let response = client.complete(request.clone()).await.unwrap();
            assert_eq!(response.content, "steady");
        }
    }
}
