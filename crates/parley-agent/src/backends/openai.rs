use super::ChatModel;
use crate::config::{LlmProvider, ModelConfig};
use crate::llm::LlmResponse;
use async_trait::async_trait;
use parley_core::{Message, ParleyError, ParleyResult, Role, ToolCall, ToolDescriptor};
use serde_json::{json, Value};
use tracing::debug;

/// OpenAI-compatible chat completions backend.
///
/// Works with OpenAI, OpenRouter, Groq, Ollama, and any other provider
/// that implements the chat completions API with function tools.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_tools(&self, tools: &[ToolDescriptor]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_schema,
                    }
                })
            })
            .collect()
    }

    fn build_body(&self, messages: &[Message], tools: &[ToolDescriptor]) -> Value {
        let mut body = json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "messages": build_messages(messages),
        });

        if !tools.is_empty() {
            body["tools"] = json!(self.build_tools(tools));
            body["tool_choice"] = json!("auto");
        }
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter ranks clients by title
        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request.header("X-Title", "parley")
        } else {
            request
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiBackend {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> ParleyResult<LlmResponse> {
        let url = self.config.completions_url();
        let body = self.build_body(messages, tools);
        debug!(model = %self.config.model_id, messages = messages.len(), tools = tools.len(), "Chat completion request");

        let resp = self
            .add_provider_headers(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ParleyError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ParleyError::Http(format!(
                "OpenAI API error {status}: {error_body}"
            )));
        }

        let resp_body: Value = resp
            .json()
            .await
            .map_err(|e| ParleyError::Http(e.to_string()))?;

        parse_openai_response(&resp_body)
    }
}

/// Serialize a transcript into chat completions `messages`.
///
/// Tool-call entries become assistant messages carrying `tool_calls`; tool
/// entries carry the `tool_call_id` they answer.
pub fn build_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| match m.role {
            Role::System => json!({"role": "system", "content": m.content}),
            Role::User => json!({"role": "user", "content": m.content}),
            Role::Assistant if m.is_tool_call() => {
                let calls: Vec<Value> = m
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments,
                            }
                        })
                    })
                    .collect();
                let content = if m.content.is_empty() {
                    Value::Null
                } else {
                    json!(m.content)
                };
                json!({"role": "assistant", "content": content, "tool_calls": calls})
            }
            Role::Assistant => json!({"role": "assistant", "content": m.content}),
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": m.tool_call_id,
                "content": m.content,
            }),
        })
        .collect()
}

/// Interpret a chat completions response body.
///
/// A tool call without an `id` or function name is rejected; a missing
/// `arguments` payload is kept as an empty string.
pub fn parse_openai_response(body: &Value) -> ParleyResult<LlmResponse> {
    let message = body["choices"]
        .get(0)
        .map(|choice| &choice["message"])
        .ok_or_else(|| ParleyError::Http(format!("Response has no choices: {body}")))?;
    let content = message["content"].as_str().unwrap_or_default().to_string();

    let raw_calls = message["tool_calls"].as_array().map(Vec::as_slice).unwrap_or_default();
    if raw_calls.is_empty() {
        return Ok(LlmResponse::Done(content));
    }

    let tool_calls = raw_calls
        .iter()
        .map(parse_tool_call)
        .collect::<ParleyResult<Vec<_>>>()?;

    Ok(LlmResponse::ToolUse {
        content: if content.is_empty() {
            None
        } else {
            Some(content)
        },
        tool_calls,
    })
}

fn parse_tool_call(raw: &Value) -> ParleyResult<ToolCall> {
    let id = raw["id"]
        .as_str()
        .ok_or_else(|| ParleyError::Http(format!("Tool call without id: {raw}")))?;
    let function = &raw["function"];
    let name = function["name"]
        .as_str()
        .ok_or_else(|| ParleyError::Http(format!("Tool call '{id}' without function name")))?;
    let arguments = match &function["arguments"] {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        // Some compatible servers send the arguments as an object.
        other => other.to_string(),
    };
    Ok(ToolCall::new(id, name, arguments))
}
