//! MCP client: connects to an MCP server via stdio (subprocess) and
//! exchanges JSON-RPC 2.0 messages.

use crate::config::McpServerConfig;
use crate::protocol::*;
use crate::session::McpSession;
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;
type SharedStdin = Arc<Mutex<Option<ChildStdin>>>;

/// How long `close` waits for the server to exit after its stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// MCP client that communicates with an MCP server over stdio.
pub struct McpClient {
    stdin: SharedStdin,
    child: Mutex<Option<Child>>,
    pending: PendingMap,
    next_id: AtomicU64,
    server_name: String,
    request_timeout: Duration,
}

impl McpClient {
    /// Spawn an MCP server subprocess and start routing its responses.
    ///
    /// The handshake is not performed here; call [`McpSession::initialize`].
    pub fn spawn(server_name: &str, config: &McpServerConfig) -> ParleyResult<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            ParleyError::Mcp(format!(
                "Failed to spawn MCP server '{server_name}' ({}): {e}",
                config.command
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ParleyError::Mcp("MCP server stdin not available".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ParleyError::Mcp("MCP server stdout not available".into()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let stdin: SharedStdin = Arc::new(Mutex::new(Some(stdin)));

        // Spawn reader task to route responses and answer server requests
        let pending_clone = pending.clone();
        let reply_stdin = stdin.clone();
        let reader_name = server_name.to_string();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!(server = %reader_name, "MCP server stdout closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match IncomingMessage::parse(trimmed) {
                            Ok(IncomingMessage::Response(resp)) => {
                                if let Some(id) = resp.id {
                                    let mut map = pending_clone.lock().await;
                                    if let Some(tx) = map.remove(&id) {
                                        let _ = tx.send(resp);
                                    } else {
                                        debug!(server = %reader_name, id, "Response for no pending request");
                                    }
                                }
                            }
                            Ok(IncomingMessage::Request { id, method }) => {
                                debug!(server = %reader_name, method = %method, "Server request");
                                let reply = server_request_reply(&id, &method).to_string();
                                if let Err(e) = write_line(&reply_stdin, &reader_name, &reply).await {
                                    warn!(server = %reader_name, method = %method, error = %e, "Failed to answer server request");
                                }
                            }
                            Ok(IncomingMessage::Notification { method }) => {
                                debug!(server = %reader_name, method = %method, "Server notification ignored");
                            }
                            Err(e) => {
                                debug!(line = %trimmed, error = %e, "Non-JSON-RPC line from MCP server");
                            }
                        }
                    }
                    Err(e) => {
                        error!(server = %reader_name, error = %e, "Error reading MCP server stdout");
                        break;
                    }
                }
            }
            // Fail outstanding requests now instead of at their timeout.
            pending_clone.lock().await.clear();
        });

        Ok(Self {
            stdin,
            child: Mutex::new(Some(child)),
            pending,
            next_id: AtomicU64::new(1),
            server_name: server_name.to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    async fn send_line(&self, msg: &str) -> ParleyResult<()> {
        write_line(&self.stdin, &self.server_name, msg).await
    }

    /// Send a JSON-RPC request and wait for the response.
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> ParleyResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let req = JsonRpcRequest::new(id, method, params);

        let (tx, rx) = oneshot::channel();
        {
            let mut map = self.pending.lock().await;
            map.insert(id, tx);
        }

        let msg = serde_json::to_string(&req)
            .map_err(|e| ParleyError::Mcp(format!("Failed to serialize request: {e}")))?;

        if let Err(e) = self.send_line(&msg).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let resp = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => {
                return Err(ParleyError::Mcp(format!(
                    "MCP server '{}' closed the connection during '{method}'",
                    self.server_name
                )))
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(ParleyError::Mcp(format!("MCP request '{method}' timed out")));
            }
        };

        if let Some(err) = &resp.error {
            return Err(ParleyError::Mcp(format!(
                "MCP error {}: {}",
                err.code, err.message
            )));
        }

        resp.result
            .ok_or_else(|| ParleyError::Mcp(format!("Empty {method} result")))
    }

    /// Send a request and decode its result into `T`.
    async fn request_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> ParleyResult<T> {
        let result = self.request(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| ParleyError::Mcp(format!("Failed to parse {method} result: {e}")))
    }

    /// Collect every page of a `*/list` method, following `nextCursor`.
    async fn list_all<T: DeserializeOwned>(&self, method: &str, key: &str) -> ParleyResult<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor
                .take()
                .map(|c| serde_json::json!({ "cursor": c }));
            let result = self.request(method, params).await?;

            let page: Vec<T> = serde_json::from_value(
                result.get(key).cloned().unwrap_or(serde_json::json!([])),
            )
            .map_err(|e| ParleyError::Mcp(format!("Failed to parse {key}: {e}")))?;
            items.extend(page);

            match result.get("nextCursor").and_then(|c| c.as_str()) {
                Some(next) if !next.is_empty() => cursor = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(items)
    }

    /// Send a JSON-RPC notification (no response expected).
    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> ParleyResult<()> {
        let msg = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.unwrap_or(serde_json::json!({})),
        });

        let serialized = serde_json::to_string(&msg)
            .map_err(|e| ParleyError::Mcp(format!("Failed to serialize notification: {e}")))?;
        self.send_line(&serialized).await
    }
}

/// Write one newline-delimited JSON message to the server.
async fn write_line(
    stdin: &Mutex<Option<ChildStdin>>,
    server_name: &str,
    msg: &str,
) -> ParleyResult<()> {
    let mut guard = stdin.lock().await;
    let stdin = guard
        .as_mut()
        .ok_or_else(|| ParleyError::Mcp(format!("MCP server '{server_name}' is closed")))?;
    stdin
        .write_all(msg.as_bytes())
        .await
        .map_err(|e| ParleyError::Mcp(format!("Failed to write to MCP stdin: {e}")))?;
    stdin
        .write_all(b"\n")
        .await
        .map_err(|e| ParleyError::Mcp(format!("Failed to write newline: {e}")))?;
    stdin
        .flush()
        .await
        .map_err(|e| ParleyError::Mcp(format!("Failed to flush stdin: {e}")))?;
    Ok(())
}

#[async_trait]
impl McpSession for McpClient {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    async fn initialize(&self) -> ParleyResult<InitializeResult> {
        let params = serde_json::json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "parley",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let result: InitializeResult = self.request_as("initialize", Some(params)).await?;
        info!(
            server = %self.server_name,
            version = %result.protocol_version,
            "MCP server initialized"
        );

        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    async fn list_tools(&self) -> ParleyResult<Vec<McpToolDef>> {
        self.list_all("tools/list", "tools").await
    }

    async fn list_prompts(&self) -> ParleyResult<Vec<McpPromptDef>> {
        self.list_all("prompts/list", "prompts").await
    }

    async fn list_resources(&self) -> ParleyResult<Vec<McpResourceDef>> {
        self.list_all("resources/list", "resources").await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> ParleyResult<McpToolResult> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        self.request_as("tools/call", Some(params)).await
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: &BTreeMap<String, String>,
    ) -> ParleyResult<GetPromptResult> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        self.request_as("prompts/get", Some(params)).await
    }

    async fn read_resource(&self, uri: &str) -> ParleyResult<ReadResourceResult> {
        let params = serde_json::json!({ "uri": uri });
        self.request_as("resources/read", Some(params)).await
    }

    async fn close(&self) -> ParleyResult<()> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };

        // Dropping stdin signals EOF; well-behaved servers exit on their own.
        drop(self.stdin.lock().await.take());

        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(server = %self.server_name, %status, "MCP server exited");
                Ok(())
            }
            Ok(Err(e)) => Err(ParleyError::Mcp(format!(
                "Failed to wait for MCP server '{}': {e}",
                self.server_name
            ))),
            Err(_) => {
                warn!(server = %self.server_name, "MCP server did not exit, killing it");
                child.kill().await.map_err(|e| {
                    ParleyError::Mcp(format!(
                        "Failed to kill MCP server '{}': {e}",
                        self.server_name
                    ))
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_request_serialization() {
        let req = JsonRpcRequest::new(1, "prompts/get", Some(serde_json::json!({"name": "x"})));
        let json = serde_json::to_string(&req).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["jsonrpc"], "2.0");
        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["method"], "prompts/get");
        assert_eq!(parsed["params"]["name"], "x");
    }

    #[test]
    fn test_json_rpc_request_no_params() {
        let req = JsonRpcRequest::new(2, "tools/list", None);
        let json = serde_json::to_string(&req).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("params").is_none());
    }

    #[test]
    fn test_json_rpc_error_parse() {
        let json =
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found");
    }

    #[test]
    fn test_initialize_result_parse() {
        let json = r#"{"protocolVersion":"2024-11-05","capabilities":{"tools":{},"prompts":{}},"serverInfo":{"name":"research","version":"1.0"}}"#;
        let result: InitializeResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.protocol_version, "2024-11-05");
        assert!(result.capabilities.tools.is_some());
        assert!(result.capabilities.prompts.is_some());
        assert!(result.capabilities.resources.is_none());
        assert_eq!(result.server_info.unwrap().name, "research");
    }

    #[tokio::test]
    async fn test_spawn_nonexistent_command() {
        let config = McpServerConfig::new("/nonexistent/mcp-server");
        let err = McpClient::spawn("ghost", &config).err().unwrap();
        assert!(err.to_string().contains("Failed to spawn MCP server 'ghost'"));
    }
}
