//! Messages API types and the client seam used by llm/agentic steps.
//!
//! Types serialize straight to the wire format; the transport lives in
//! `io::anthropic`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Request body for the Messages API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl MessagesRequest {
    /// A single-turn request; an empty `system` is omitted.
    pub fn single_turn(model: &str, max_tokens: u32, system: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            system: (!system.is_empty()).then(|| system.to_string()),
            messages: vec![Message::user_text(prompt)],
            tools: Vec::new(),
        }
    }

    /// Text of the first user message, mostly for assertions and debug output.
    pub fn first_prompt(&self) -> Option<&str> {
        self.messages.first().and_then(|m| {
            m.content.iter().find_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: &str) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Block types this client does not act on (e.g. `thinking`).
    #[serde(other)]
    Unknown,
}

/// A tool the model may call, with a JSON Schema for its input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Response from the Messages API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: TokenUsage,
}

pub const STOP_END_TURN: &str = "end_turn";

impl MessagesResponse {
    /// All text blocks concatenated, trimmed.
    pub fn text(&self) -> String {
        let joined: String = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        joined.trim().to_string()
    }

    pub fn is_end_turn(&self) -> bool {
        self.stop_reason.as_deref() == Some(STOP_END_TURN)
    }
}

/// Token counts reported for one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
}

/// Transport and API failures from the model client.
#[derive(Debug, Error)]
pub enum LlmRequestError {
    #[error("no API key configured (run `x configure` or set ANTHROPIC_API_KEY)")]
    MissingApiKey,
    #[error("failed to reach {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("anthropic http error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("anthropic returned invalid JSON")]
    Decode {
        #[source]
        source: reqwest::Error,
    },
}

/// Sends one Messages API request.
pub trait LlmClient {
    fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse>;
}
