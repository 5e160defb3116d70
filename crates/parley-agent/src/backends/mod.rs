pub mod openai;

use crate::llm::LlmResponse;
use async_trait::async_trait;
use parley_core::{Message, ParleyResult, ToolDescriptor};

/// A chat completion backend.
///
/// The transcript is sent whole on every call; system instructions, if any,
/// are part of it as [`parley_core::Role::System`] entries.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> ParleyResult<LlmResponse>;
}
