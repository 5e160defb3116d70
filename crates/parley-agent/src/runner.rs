use crate::config::ModelConfig;
use crate::events::{AgentEvent, EventSink, TracingSink};
use crate::llm::{LlmClient, LlmResponse};
use parley_core::{Message, ParleyError, ParleyResult, ToolCall, ToolResult};
use parley_mcp::SessionRegistry;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// A finished query: the full transcript and the final answer.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub transcript: Vec<Message>,
    pub answer: String,
    /// Number of model calls it took.
    pub turns: u32,
}

/// The agent runner: drives one query through the tool-calling loop.
/// Query → model → tool calls → execute via owning session → append → repeat.
pub struct AgentRunner {
    llm: LlmClient,
    registry: Arc<SessionRegistry>,
    events: Arc<dyn EventSink>,
    system_prompt: Option<String>,
    max_turns: u32,
}

impl AgentRunner {
    pub fn new(config: ModelConfig, registry: Arc<SessionRegistry>) -> Self {
        let max_turns = config.max_turns;
        Self::with_client(LlmClient::new(config), registry, max_turns)
    }

    pub fn with_client(llm: LlmClient, registry: Arc<SessionRegistry>, max_turns: u32) -> Self {
        Self {
            llm,
            registry,
            events: Arc::new(TracingSink),
            system_prompt: None,
            max_turns,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Prepend a system entry to every transcript.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub(crate) fn emit(&self, event: AgentEvent) {
        self.events.emit(event);
    }

    /// Answer one query, calling tools for as many turns as the model needs.
    ///
    /// Every tool call the model makes is recorded as an assistant tool-call
    /// entry followed by its tool entry, in the order the model issued them.
    /// Unknown tools and malformed arguments are answered with an error entry
    /// and the loop continues; a transport failure aborts the query.
    pub async fn process_query(&self, query: &str) -> ParleyResult<Conversation> {
        let conversation_id = Uuid::new_v4();
        let mut transcript = Vec::new();
        if let Some(prompt) = &self.system_prompt {
            transcript.push(Message::system(prompt, conversation_id));
        }
        transcript.push(Message::user(query, conversation_id));

        let tools = self.registry.catalog().tools();
        info!(conversation_id = %conversation_id, tools = tools.len(), "Starting query");

        for turn in 0..self.max_turns {
            info!(turn = turn, "Model turn");
            match self.llm.chat(&transcript, tools).await? {
                LlmResponse::Done(answer) => {
                    transcript.push(Message::assistant(&answer, conversation_id));
                    self.emit(AgentEvent::Answer {
                        text: answer.clone(),
                    });
                    info!(conversation_id = %conversation_id, turns = turn + 1, "Query completed");
                    return Ok(Conversation {
                        id: conversation_id,
                        transcript,
                        answer,
                        turns: turn + 1,
                    });
                }
                LlmResponse::ToolUse {
                    content,
                    tool_calls,
                } => {
                    if let Some(text) = content {
                        self.emit(AgentEvent::Note { text });
                    }
                    for call in tool_calls {
                        let content = self.handle_tool_call(&call).await?;
                        let call_id = call.id.clone();
                        transcript.push(Message::tool_call(call, conversation_id));
                        transcript.push(Message::tool_result(call_id, content, conversation_id));
                    }
                }
            }
        }

        warn!(
            conversation_id = %conversation_id,
            max_turns = self.max_turns,
            "Query aborted at turn limit"
        );
        Err(ParleyError::TurnLimitExceeded(self.max_turns))
    }

    /// Run one call and produce the content of its tool entry.
    async fn handle_tool_call(&self, call: &ToolCall) -> ParleyResult<String> {
        self.emit(AgentEvent::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        match self.execute_tool(call).await {
            Ok(result) => {
                self.emit(AgentEvent::ToolResult {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    is_error: result.is_error,
                });
                Ok(result.content)
            }
            Err(e @ (ParleyError::NotFound { .. } | ParleyError::InvalidArguments { .. })) => {
                warn!(call_id = %call.id, tool = %call.name, error = %e, "Tool call not executed");
                let reason = e.to_string();
                self.emit(AgentEvent::ToolSkipped {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    reason: reason.clone(),
                });
                Ok(format!("Error: {reason}"))
            }
            Err(e) => Err(e),
        }
    }

    async fn execute_tool(&self, call: &ToolCall) -> ParleyResult<ToolResult> {
        let arguments = call
            .parse_arguments()
            .map_err(|source| ParleyError::InvalidArguments {
                tool: call.name.clone(),
                source,
            })?;
        let session = self.registry.dispatcher().resolve_tool(&call.name)?;

        let result = session.call_tool(&call.name, arguments).await?;
        let content = result.text();
        Ok(if result.is_error {
            ToolResult::error(&call.id, content)
        } else {
            ToolResult::success(&call.id, content)
        })
    }
}
