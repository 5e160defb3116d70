//! The session interface the registry and conversation loop talk to.

use crate::client::McpClient;
use crate::config::McpServerConfig;
use crate::protocol::{
    GetPromptResult, InitializeResult, McpPromptDef, McpResourceDef, McpToolDef, McpToolResult,
    ReadResourceResult,
};
use async_trait::async_trait;
use parley_core::ParleyResult;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One established connection to an MCP server.
///
/// Implemented by [`McpClient`] for stdio servers; tests provide in-memory
/// implementations.
#[async_trait]
pub trait McpSession: Send + Sync {
    /// The name the server was registered under.
    fn server_name(&self) -> &str;

    /// Perform the protocol handshake.
    async fn initialize(&self) -> ParleyResult<InitializeResult>;

    async fn list_tools(&self) -> ParleyResult<Vec<McpToolDef>>;

    async fn list_prompts(&self) -> ParleyResult<Vec<McpPromptDef>>;

    async fn list_resources(&self) -> ParleyResult<Vec<McpResourceDef>>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> ParleyResult<McpToolResult>;

    async fn get_prompt(
        &self,
        name: &str,
        arguments: &BTreeMap<String, String>,
    ) -> ParleyResult<GetPromptResult>;

    async fn read_resource(&self, uri: &str) -> ParleyResult<ReadResourceResult>;

    /// Release the underlying transport. Calling it again is a no-op.
    async fn close(&self) -> ParleyResult<()>;
}

/// Opens sessions from launch configuration.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(
        &self,
        server_name: &str,
        config: &McpServerConfig,
    ) -> ParleyResult<Arc<dyn McpSession>>;
}

/// Launches each server as a child process and speaks JSON-RPC over its stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioConnector;

#[async_trait]
impl SessionConnector for StdioConnector {
    async fn connect(
        &self,
        server_name: &str,
        config: &McpServerConfig,
    ) -> ParleyResult<Arc<dyn McpSession>> {
        let client = McpClient::spawn(server_name, config)?;
        Ok(Arc::new(client))
    }
}
