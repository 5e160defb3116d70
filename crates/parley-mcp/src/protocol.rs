//! MCP (Model Context Protocol) JSON-RPC 2.0 message types.

use parley_core::ToolDescriptor;
use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// JSON-RPC "method not found" error code.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// One line received from a server, classified by shape.
///
/// Anything carrying a `method` originates on the server side, even when it
/// also has an `id` that happens to collide with one of ours.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Response(JsonRpcResponse),
    Request {
        id: serde_json::Value,
        method: String,
    },
    Notification {
        method: String,
    },
}

impl IncomingMessage {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        let method = value
            .get("method")
            .and_then(serde_json::Value::as_str)
            .map(String::from);
        match (method, value.get("id")) {
            (Some(method), Some(id)) if !id.is_null() => Ok(Self::Request {
                id: id.clone(),
                method,
            }),
            (Some(method), _) => Ok(Self::Notification { method }),
            (None, _) => serde_json::from_value(value).map(Self::Response),
        }
    }
}

/// The reply sent for a server-initiated request: `ping` succeeds with an
/// empty result, every other method is refused.
pub fn server_request_reply(id: &serde_json::Value, method: &str) -> serde_json::Value {
    if method == "ping" {
        serde_json::json!({"jsonrpc": "2.0", "id": id, "result": {}})
    } else {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {
                "code": METHOD_NOT_FOUND,
                "message": format!("Method not found: {method}"),
            }
        })
    }
}

/// MCP tool definition from the `tools/list` response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_input_schema", rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn default_input_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl McpToolDef {
    /// The descriptor handed to the model for this tool.
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters_schema: self.input_schema.clone(),
        }
    }
}

/// MCP prompt template from the `prompts/list` response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpPromptDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<McpPromptArgument>,
}

/// One named argument a prompt template accepts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct McpPromptArgument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// MCP resource from the `resources/list` response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpResourceDef {
    pub uri: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
}

/// MCP tool call result from the `tools/call` response.
#[derive(Debug, Clone, Deserialize)]
pub struct McpToolResult {
    #[serde(default)]
    pub content: Vec<McpContent>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl McpToolResult {
    /// All content blocks rendered and joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(McpContent::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// MCP content block.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

impl McpContent {
    /// Text blocks render as their text; anything else as a placeholder.
    pub fn render(&self) -> String {
        if self.content_type == "text" {
            self.text.clone()
        } else {
            format!("[{} content]", self.content_type)
        }
    }
}

/// MCP `prompts/get` response.
#[derive(Debug, Clone, Deserialize)]
pub struct GetPromptResult {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub messages: Vec<PromptMessage>,
}

/// A message produced by instantiating a prompt template.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMessage {
    #[serde(default)]
    pub role: String,
    pub content: PromptContent,
}

/// The shapes a prompt message's content can take on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PromptContent {
    /// A bare string.
    Text(String),
    /// A single content block.
    Block(McpContent),
    /// A list of content blocks.
    Blocks(Vec<McpContent>),
}

impl PromptContent {
    /// Flatten to plain text; multiple blocks are joined with spaces.
    pub fn text(&self) -> String {
        match self {
            PromptContent::Text(text) => text.clone(),
            PromptContent::Block(block) => block.render(),
            PromptContent::Blocks(blocks) => blocks
                .iter()
                .map(McpContent::render)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// MCP `resources/read` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceResult {
    #[serde(default)]
    pub contents: Vec<ResourceContents>,
}

/// One content item of a read resource.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub blob: Option<String>,
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
}

/// MCP server capabilities from the `initialize` response.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: Option<serde_json::Value>,
    #[serde(default)]
    pub resources: Option<serde_json::Value>,
    #[serde(default)]
    pub prompts: Option<serde_json::Value>,
}

/// MCP initialize response.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    #[serde(default, rename = "serverInfo")]
    pub server_info: Option<ServerInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_request_with_colliding_id() {
        let msg = IncomingMessage::parse(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        match msg {
            IncomingMessage::Request { id, method } => {
                assert_eq!(id, serde_json::json!(1));
                assert_eq!(method, "ping");
            }
            other => panic!("expected a server request, got {other:?}"),
        }
    }

    #[test]
    fn test_incoming_response_and_notification() {
        let resp = IncomingMessage::parse(r#"{"jsonrpc":"2.0","id":4,"result":{"tools":[]}}"#).unwrap();
        assert!(matches!(resp, IncomingMessage::Response(JsonRpcResponse { id: Some(4), .. })));

        let note = IncomingMessage::parse(
            r#"{"jsonrpc":"2.0","method":"notifications/tools/list_changed"}"#,
        )
        .unwrap();
        assert!(matches!(note, IncomingMessage::Notification { .. }));

        assert!(IncomingMessage::parse("starting server...").is_err());
    }

    #[test]
    fn test_server_request_reply() {
        let pong = server_request_reply(&serde_json::json!("srv-1"), "ping");
        assert_eq!(pong, serde_json::json!({"jsonrpc": "2.0", "id": "srv-1", "result": {}}));

        let refused = server_request_reply(&serde_json::json!(7), "sampling/createMessage");
        assert_eq!(refused["id"], 7);
        assert_eq!(refused["error"]["code"], METHOD_NOT_FOUND);
        assert!(refused.get("result").is_none());
    }

    #[test]
    fn test_prompt_def_parse() {
        let json = r#"{"name":"generate_search_prompt","description":"Search papers","arguments":[{"name":"topic","required":true},{"name":"num_papers"}]}"#;
        let prompt: McpPromptDef = serde_json::from_str(json).unwrap();
        assert_eq!(prompt.arguments.len(), 2);
        assert!(prompt.arguments[0].required);
        assert!(!prompt.arguments[1].required);
        assert_eq!(prompt.arguments[1].description, "");
    }

    #[test]
    fn test_prompt_content_shapes() {
        let plain: PromptMessage =
            serde_json::from_str(r#"{"role":"user","content":"hello"}"#).unwrap();
        assert_eq!(plain.content.text(), "hello");

        let block: PromptMessage = serde_json::from_str(
            r#"{"role":"user","content":{"type":"text","text":"search for quantum"}}"#,
        )
        .unwrap();
        assert!(matches!(block.content, PromptContent::Block(_)));
        assert_eq!(block.content.text(), "search for quantum");

        let blocks: PromptMessage = serde_json::from_str(
            r#"{"role":"user","content":[{"type":"text","text":"a"},{"type":"image","data":"..."}]}"#,
        )
        .unwrap();
        assert_eq!(blocks.content.text(), "a [image content]");
    }

    #[test]
    fn test_read_resource_parse() {
        let json = r##"{"contents":[{"uri":"papers://folders","mimeType":"text/markdown","text":"# Topics"}]}"##;
        let result: ReadResourceResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.contents[0].text.as_deref(), Some("# Topics"));
        assert_eq!(result.contents[0].mime_type.as_deref(), Some("text/markdown"));
    }

    #[test]
    fn test_tool_result_text_joins_blocks() {
        let json = r#"{"content":[{"type":"text","text":"line one"},{"type":"text","text":"line two"}]}"#;
        let result: McpToolResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.text(), "line one\nline two");
    }

    #[test]
    fn test_tool_descriptor_defaults_schema() {
        let tool: McpToolDef = serde_json::from_str(r#"{"name":"list_topics"}"#).unwrap();
        let descriptor = tool.descriptor();
        assert_eq!(descriptor.name, "list_topics");
        assert_eq!(descriptor.parameters_schema["type"], "object");
    }
}
