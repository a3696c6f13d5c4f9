// crates/grid-providers/src/lib.rs
// ============================================================================
// Crate: grid-providers
// Description: Async LLM oracle client used by the safety guardian (C8) and
//              strategic agent (C9).
// Purpose: Give both callers one pluggable abstraction over "ask the
//          oracle" instead of each embedding its own HTTP plumbing.
// ============================================================================

//! ## Overview
//! `grid-providers` mirrors this workspace's evidence-provider crate in
//! shape — a config struct, a fail-closed constructor, a narrow trait at
//! the seam — adapted from one-shot blocking checks to an async client
//! called repeatedly over a live process's lifetime.

pub mod config;
pub mod http;
pub mod llm;

pub use config::ConfigError;
pub use config::OracleConfig;
pub use http::HttpLlmClient;
pub use http::HttpLlmConfig;
pub use llm::ChatCompletionRequest;
pub use llm::ChatCompletionResponse;
pub use llm::ChatMessage;
pub use llm::LlmClient;
pub use llm::LlmError;
pub use llm::MockLlmClient;
pub use llm::ToolCallRequest;
