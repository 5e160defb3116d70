//! The tool-calling agent: model backends, the conversation loop, and
//! direct access to MCP resources and prompt templates.

pub mod access;
pub mod backends;
pub mod config;
pub mod events;
pub mod llm;
pub mod runner;

pub use access::{fetch_resource, list_prompts};
pub use backends::ChatModel;
pub use config::{LlmProvider, ModelConfig};
pub use events::{AgentEvent, EventSink, TracingSink};
pub use llm::{LlmClient, LlmResponse};
pub use runner::{AgentRunner, Conversation};
