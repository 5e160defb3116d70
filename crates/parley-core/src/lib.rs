//! Core types and error definitions for parley.
//!
//! This crate provides the foundational types shared across all parley crates,
//! including error handling, transcript messages, and tool call abstractions.
//!
//! # Main types
//!
//! - [`ParleyError`]: Unified error enum for all parley subsystems.
//! - [`ParleyResult`]: Convenience alias for `Result<T, ParleyError>`.
//! - [`Role`]: Message role (user, assistant, system, tool).
//! - [`Message`]: A single entry of a conversation transcript.
//! - [`ToolCall`]: A model-issued tool invocation request with raw arguments.
//! - [`ToolResult`]: The result returned after executing a tool call.
//! - [`ToolDescriptor`]: A tool as advertised to the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// --- Error types ---

/// The namespace a capability lives in.
///
/// Tools, prompts, and resources are resolved in separate namespaces, so a
/// tool and a resource may share the same string without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// A model-invocable tool.
    Tool,
    /// A parameterized prompt template.
    Prompt,
    /// An addressable resource, identified by URI.
    Resource,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CapabilityKind::Tool => "Tool",
            CapabilityKind::Prompt => "Prompt",
            CapabilityKind::Resource => "Resource",
        };
        f.write_str(label)
    }
}

/// Top-level error type for parley.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// An error originating from the conversation loop.
    #[error("Agent error: {0}")]
    Agent(String),

    /// An error from an outbound HTTP request (e.g. the chat completions API).
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error in configuration loading or validation. Fatal at startup.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an MCP server connection or call.
    #[error("MCP error: {0}")]
    Mcp(String),

    /// A tool, prompt, or resource that no connected server owns.
    #[error("{kind} '{name}' not found.")]
    NotFound {
        /// Namespace that was searched.
        kind: CapabilityKind,
        /// The name or URI that failed to resolve.
        name: String,
    },

    /// A tool call whose argument payload could not be parsed.
    #[error("Invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        /// The tool the model tried to call.
        tool: String,
        /// What was wrong with the payload.
        #[source]
        source: ArgumentError,
    },

    /// The model kept requesting tools past the configured turn cap.
    #[error("Conversation aborted after reaching the maximum of {0} model turns")]
    TurnLimitExceeded(u32),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParleyError {
    /// Shorthand for a [`ParleyError::NotFound`].
    pub fn not_found(kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether this error is a resolution miss rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A convenience `Result` alias using [`ParleyError`].
pub type ParleyResult<T> = Result<T, ParleyError>;

/// Why a tool call's argument payload was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ArgumentError {
    /// The payload is not valid JSON.
    #[error("arguments are not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The payload is valid JSON but not an object.
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

// --- Message types ---

/// The role of the participant that authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user.
    User,
    /// The AI assistant.
    Assistant,
    /// A system-level instruction or prompt.
    System,
    /// Output produced by a tool invocation.
    Tool,
}

/// A single entry in a conversation transcript.
///
/// Assistant entries may carry tool calls instead of text; tool entries
/// reference the call they answer through `tool_call_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub id: Uuid,
    /// The role of the message author.
    pub role: Role,
    /// The textual content of the message.
    #[serde(default)]
    pub content: String,
    /// Tool invocations requested by the assistant in this entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For [`Role::Tool`] entries, the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// The conversation this message belongs to.
    pub conversation_id: Uuid,
    /// UTC timestamp of when the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a new message with the given role, content, and conversation ID.
    pub fn new(role: Role, content: impl Into<String>, conversation_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            conversation_id,
            timestamp: Utc::now(),
        }
    }

    /// Creates a new message with [`Role::User`].
    pub fn user(content: impl Into<String>, conversation_id: Uuid) -> Self {
        Self::new(Role::User, content, conversation_id)
    }

    /// Creates a new message with [`Role::Assistant`].
    pub fn assistant(content: impl Into<String>, conversation_id: Uuid) -> Self {
        Self::new(Role::Assistant, content, conversation_id)
    }

    /// Creates a new message with [`Role::System`].
    pub fn system(content: impl Into<String>, conversation_id: Uuid) -> Self {
        Self::new(Role::System, content, conversation_id)
    }

    /// Creates an assistant entry recording a single tool invocation request.
    pub fn tool_call(call: ToolCall, conversation_id: Uuid) -> Self {
        let mut msg = Self::new(Role::Assistant, String::new(), conversation_id);
        msg.tool_calls.push(call);
        msg
    }

    /// Creates a [`Role::Tool`] entry answering the call with `call_id`.
    pub fn tool_result(
        call_id: impl Into<String>,
        content: impl Into<String>,
        conversation_id: Uuid,
    ) -> Self {
        let mut msg = Self::new(Role::Tool, content, conversation_id);
        msg.tool_call_id = Some(call_id.into());
        msg
    }

    /// Whether this is an assistant entry carrying tool calls.
    pub fn is_tool_call(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

// --- Tool types ---

/// A request from the model to invoke a specific tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the model, unique within one response.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// The argument payload exactly as the model serialized it.
    pub arguments: String,
}

impl ToolCall {
    /// Creates a tool call from its parts.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the raw argument payload into a JSON object.
    ///
    /// An empty payload is treated as an empty object; some providers send
    /// `""` for tools that take no parameters.
    pub fn parse_arguments(
        &self,
    ) -> Result<serde_json::Map<String, serde_json::Value>, ArgumentError> {
        if self.arguments.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        let value: serde_json::Value =
            serde_json::from_str(&self.arguments).map_err(ArgumentError::Malformed)?;
        match value {
            serde_json::Value::Object(map) => Ok(map),
            serde_json::Value::Null => Err(ArgumentError::NotAnObject("null")),
            serde_json::Value::Bool(_) => Err(ArgumentError::NotAnObject("a boolean")),
            serde_json::Value::Number(_) => Err(ArgumentError::NotAnObject("a number")),
            serde_json::Value::String(_) => Err(ArgumentError::NotAnObject("a string")),
            serde_json::Value::Array(_) => Err(ArgumentError::NotAnObject("an array")),
        }
    }
}

/// The result returned after executing a [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The ID of the [`ToolCall`] this result corresponds to.
    pub call_id: String,
    /// The textual output produced by the tool.
    pub content: String,
    /// Whether the tool execution ended in an error.
    pub is_error: bool,
}

impl ToolResult {
    /// Creates a successful tool result.
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates an error tool result.
    pub fn error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// A tool as presented to the model: name, description, JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name the model uses to call the tool.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters_schema: serde_json::Value,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments_object() {
        let call = ToolCall::new("call_1", "get_forecast", r#"{"city":"Boston"}"#);
        let args = call.parse_arguments().unwrap();
        assert_eq!(args["city"], "Boston");
    }

    #[test]
    fn test_parse_arguments_empty_payload() {
        let call = ToolCall::new("call_1", "list_topics", "  ");
        assert!(call.parse_arguments().unwrap().is_empty());
    }

    #[test]
    fn test_parse_arguments_malformed() {
        let call = ToolCall::new("call_1", "get_forecast", r#"{"city":"#);
        assert!(matches!(
            call.parse_arguments(),
            Err(ArgumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_arguments_not_an_object() {
        let call = ToolCall::new("call_1", "get_forecast", "[1, 2]");
        let err = call.parse_arguments().unwrap_err();
        assert_eq!(err.to_string(), "arguments must be a JSON object, got an array");
    }

    #[test]
    fn test_tool_result_entry_links_call() {
        let sid = Uuid::new_v4();
        let msg = Message::tool_result("call_9", "sunny", sid);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_9"));
        assert!(!msg.is_tool_call());
    }

    #[test]
    fn test_not_found_display() {
        let err = ParleyError::not_found(CapabilityKind::Prompt, "summarize");
        assert_eq!(err.to_string(), "Prompt 'summarize' not found.");
        assert!(err.is_not_found());
    }
}
