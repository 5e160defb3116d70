use serde::{Deserialize, Serialize};
use tracing::debug;

/// Progress reported by the agent while it works on a query.
///
/// Front ends render these as they arrive; the transcript itself is only
/// returned once the query finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Text the model sent alongside its tool calls.
    Note { text: String },

    /// The model asked for a tool; emitted before anything is executed.
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },

    /// The tool ran. `is_error` mirrors the server's `isError` flag.
    ToolResult {
        id: String,
        name: String,
        is_error: bool,
    },

    /// The call was answered with an error entry without reaching a server.
    ToolSkipped {
        id: String,
        name: String,
        reason: String,
    },

    /// A prompt template expanded into a new query.
    PromptStarted { name: String },

    /// The final answer of a query.
    Answer { text: String },
}

/// Receives [`AgentEvent`]s synchronously, in the order they happen.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

/// Default sink: events go to the `tracing` subscriber at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AgentEvent) {
        match &event {
            AgentEvent::ToolCall { id, name, .. } => {
                debug!(call_id = %id, tool = %name, "Tool call requested");
            }
            AgentEvent::ToolSkipped { id, name, reason } => {
                debug!(call_id = %id, tool = %name, reason = %reason, "Tool call skipped");
            }
            other => debug!(event = ?other, "Agent event"),
        }
    }
}
