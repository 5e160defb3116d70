use crate::backends::openai::OpenAiBackend;
use crate::backends::ChatModel;
use crate::config::{LlmProvider, ModelConfig};
use parley_core::{Message, ParleyResult, ToolCall, ToolDescriptor};

/// What the model answered for one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponse {
    /// One or more tool invocations, with any text the model sent alongside.
    ToolUse {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// A plain answer that ends the query.
    Done(String),
}

/// Model client that dispatches to the provider backend.
pub struct LlmClient {
    backend: Box<dyn ChatModel>,
}

impl LlmClient {
    pub fn new(config: ModelConfig) -> Self {
        let backend: Box<dyn ChatModel> = match config.provider {
            LlmProvider::OpenAi | LlmProvider::OpenRouter | LlmProvider::Groq => {
                Box::new(OpenAiBackend::new(config))
            }
        };
        Self { backend }
    }

    /// Wrap a pre-built backend.
    pub fn from_backend(backend: Box<dyn ChatModel>) -> Self {
        Self { backend }
    }

    pub async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> ParleyResult<LlmResponse> {
        self.backend.chat(messages, tools).await
    }
}
