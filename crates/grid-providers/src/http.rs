// crates/grid-providers/src/http.rs
// ============================================================================
// Module: HTTP LLM Client
// Description: Async chat-completion client backed by reqwest.
// Purpose: Give the guardian's policy oracle and the strategic agent's
//          tool-use loop a real network-backed LlmClient implementation.
// Dependencies: reqwest, serde_json, tokio
// ============================================================================

//! ## Overview
//! [`HttpLlmClient`] posts an OpenAI-style chat completion request to a
//! configured endpoint and parses the response into [`ChatCompletionResponse`].
//! Unlike this workspace's one-shot evidence providers, the oracle is a live
//! dependency called on every guardian review and every agent tool-use
//! round, so the client here is async end to end rather than blocking.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::llm::ChatCompletionRequest;
use crate::llm::ChatCompletionResponse;
use crate::llm::LlmClient;
use crate::llm::LlmError;
use crate::llm::ToolCallRequest;

/// Configuration for [`HttpLlmClient`].
///
/// # Invariants
/// - `timeout` bounds the full request lifecycle, including connection
///   setup.
/// - `max_response_bytes` is a hard upper bound on the response body; a
///   larger response is reported as [`LlmError::Malformed`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpLlmConfig {
    /// Base URL of the chat completion endpoint, e.g.
    /// `https://api.example.com/v1/chat/completions`.
    pub endpoint: String,
    /// Bearer credential sent as `Authorization: Bearer <credential>`.
    pub credential: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum response body size accepted.
    pub max_response_bytes: usize,
}

impl Default for HttpLlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            credential: String::new(),
            timeout: Duration::from_secs(30),
            max_response_bytes: 1024 * 1024,
        }
    }
}

/// Async chat-completion client backed by `reqwest`.
pub struct HttpLlmClient {
    config: HttpLlmConfig,
    client: Client,
}

impl HttpLlmClient {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Transport`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: HttpLlmConfig) -> Result<Self, LlmError> {
        Url::parse(&config.endpoint).map_err(|_| LlmError::Transport("invalid oracle endpoint url".to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| LlmError::Transport(err.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        let wire_request = WireRequest::from(&request);
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.credential)
            .json(&wire_request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    LlmError::Transport(err.to_string())
                }
            })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_response_bytes
        {
            return Err(LlmError::Malformed("response exceeds configured size limit".to_string()));
        }

        let status = response.status();
        let body =
            response.text().await.map_err(|err| LlmError::Transport(err.to_string()))?;
        if body.len() > self.config.max_response_bytes {
            return Err(LlmError::Malformed("response exceeds configured size limit".to_string()));
        }
        if !status.is_success() {
            return Err(LlmError::Transport(format!("oracle returned status {status}: {body}")));
        }

        let wire: WireResponse =
            serde_json::from_str(&body).map_err(|err| LlmError::Malformed(err.to_string()))?;
        wire.into_response()
    }
}

/// Wire shape of an outbound chat completion request, matching common
/// OpenAI-compatible chat endpoints.
#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCallOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireToolCallOut {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCallOut,
}

#[derive(Debug, Serialize)]
struct WireFunctionCallOut {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolFunction,
}

#[derive(Debug, Serialize)]
struct WireToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl From<&ChatCompletionRequest> for WireRequest {
    fn from(request: &ChatCompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request
                .tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireToolFunction {
                        name: tool.name.0.clone(),
                        description: tool.description.clone(),
                        parameters: tool.input_schema.clone(),
                    },
                })
                .collect(),
        }
    }
}

impl From<&crate::llm::ChatMessage> for WireMessage {
    fn from(message: &crate::llm::ChatMessage) -> Self {
        Self {
            role: message.role.clone(),
            content: message.content.clone(),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| WireToolCallOut {
                    id: call.id.clone(),
                    kind: "function",
                    function: WireFunctionCallOut {
                        name: call.tool_name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

impl WireResponse {
    fn into_response(self) -> Result<ChatCompletionResponse, LlmError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Malformed("oracle returned no choices".to_string()))?;
        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| {
                let arguments = serde_json::from_str(&call.function.arguments)
                    .unwrap_or(serde_json::Value::String(call.function.arguments));
                ToolCallRequest { id: call.id, tool_name: call.function.name, arguments }
            })
            .collect();
        Ok(ChatCompletionResponse { content: choice.message.content.unwrap_or_default(), tool_calls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_request_carries_model_and_message_text() {
        let request = ChatCompletionRequest {
            model: "guardian-model".to_string(),
            messages: vec![crate::llm::ChatMessage {
                role: "user".to_string(),
                content: "evaluate this action".to_string(),
                tool_calls: Vec::new(),
                tool_call_id: None,
            }],
            tools: Vec::new(),
        };
        let wire = WireRequest::from(&request);
        assert_eq!(wire.model, "guardian-model");
        assert_eq!(wire.messages[0].content, "evaluate this action");
    }

    #[test]
    fn wire_request_forwards_tool_descriptors_as_function_definitions() {
        let request = ChatCompletionRequest {
            model: "strategic-model".to_string(),
            messages: Vec::new(),
            tools: vec![grid_contract::ToolDescriptor {
                name: grid_contract::ToolName::from("zone1_trip_line"),
                description: "Trips a line".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
                output_schema: serde_json::json!({"type": "object"}),
                safety_class: grid_contract::SafetyClass::MediumRisk,
            }],
        };
        let wire = WireRequest::from(&request);
        assert_eq!(wire.tools.len(), 1);
        assert_eq!(wire.tools[0].function.name, "zone1_trip_line");
    }

    #[test]
    fn new_rejects_a_malformed_endpoint_url() {
        let config = HttpLlmConfig { endpoint: "not a url".to_string(), ..HttpLlmConfig::default() };
        assert!(HttpLlmClient::new(config).is_err());
    }

    #[test]
    fn wire_response_with_no_choices_is_malformed() {
        let wire = WireResponse { choices: Vec::new() };
        let result = wire.into_response();
        assert!(matches!(result, Err(LlmError::Malformed(_))));
    }

    #[test]
    fn wire_response_parses_tool_call_arguments_as_json() {
        let wire = WireResponse {
            choices: vec![WireChoice {
                message: WireChoiceMessage {
                    content: None,
                    tool_calls: vec![WireToolCall {
                        id: "call_1".to_string(),
                        function: WireFunctionCall {
                            name: "zone_registry_trip_line".to_string(),
                            arguments: r#"{"line_id": "line7"}"#.to_string(),
                        },
                    }],
                },
            }],
        };
        let response = wire.into_response().expect("parse");
        assert_eq!(response.tool_calls[0].tool_name, "zone_registry_trip_line");
        assert_eq!(response.tool_calls[0].arguments["line_id"], "line7");
    }
}
