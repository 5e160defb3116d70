use crate::catalog::{Catalog, PromptDescriptor};
use crate::config::{McpServerConfig, ServersConfig};
use crate::dispatch::Dispatcher;
use crate::protocol::{McpPromptDef, McpResourceDef, McpToolDef};
use crate::session::{McpSession, SessionConnector};
use parley_core::{ParleyError, ParleyResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened when one server was registered.
#[derive(Debug)]
pub enum RegistrationOutcome {
    Connected {
        tools: Vec<String>,
        prompts: usize,
        resources: usize,
    },
    Failed(ParleyError),
}

impl RegistrationOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Outcome of registering a named server, as returned by [`SessionRegistry::connect_all`].
#[derive(Debug)]
pub struct RegistrationReport {
    pub server: String,
    pub outcome: RegistrationOutcome,
}

/// Internal state for a registered server.
pub(crate) struct ServerEntry {
    pub(crate) name: String,
    pub(crate) session: Arc<dyn McpSession>,
    pub(crate) tools: Vec<String>,
    pub(crate) prompts: Vec<String>,
    pub(crate) resources: Vec<String>,
}

/// Everything a server advertised during its connect phase.
struct Discovered {
    tools: Vec<McpToolDef>,
    prompts: Vec<McpPromptDef>,
    resources: Vec<McpResourceDef>,
}

/// Owns the live server sessions and maps each capability to its owner.
///
/// Built with `&mut self` during startup, then shared read-only (usually
/// behind an `Arc`) for the interactive phase. Tools, prompts, and resources
/// live in separate maps; within each map a later registration of the same
/// name replaces the earlier owner.
#[derive(Default)]
pub struct SessionRegistry {
    pub(crate) servers: Vec<ServerEntry>,
    pub(crate) tools: HashMap<String, usize>,
    pub(crate) prompts: HashMap<String, usize>,
    pub(crate) resources: HashMap<String, usize>,
    catalog: Catalog,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every configured server in file order.
    ///
    /// A server that fails to connect is logged and skipped; the others are
    /// still registered.
    pub async fn connect_all(
        &mut self,
        config: &ServersConfig,
        connector: &dyn SessionConnector,
    ) -> Vec<RegistrationReport> {
        let mut reports = Vec::with_capacity(config.servers.len());
        for server in &config.servers {
            let outcome = self.register(&server.name, &server.config, connector).await;
            reports.push(RegistrationReport {
                server: server.name.clone(),
                outcome,
            });
        }
        reports
    }

    /// Connect to one server, discover its capabilities, and record them.
    pub async fn register(
        &mut self,
        server_name: &str,
        config: &McpServerConfig,
        connector: &dyn SessionConnector,
    ) -> RegistrationOutcome {
        match self.try_register(server_name, config, connector).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    server = %server_name,
                    command = %config.command,
                    error = %e,
                    "Failed to connect MCP server"
                );
                RegistrationOutcome::Failed(e)
            }
        }
    }

    async fn try_register(
        &mut self,
        server_name: &str,
        config: &McpServerConfig,
        connector: &dyn SessionConnector,
    ) -> ParleyResult<RegistrationOutcome> {
        let session = connector.connect(server_name, config).await?;

        let discovered = match Self::discover(session.as_ref()).await {
            Ok(discovered) => discovered,
            Err(e) => {
                if let Err(close_err) = session.close().await {
                    debug!(server = %server_name, error = %close_err, "Close after failed discovery");
                }
                return Err(e);
            }
        };

        Ok(self.commit(server_name, session, discovered))
    }

    /// Handshake, then list tools, prompts, and resources.
    ///
    /// Prompts and resources are optional: they are only listed when the
    /// server advertises them, and a failure to list them leaves them empty.
    async fn discover(session: &dyn McpSession) -> ParleyResult<Discovered> {
        let init = session.initialize().await?;
        let tools = session.list_tools().await?;

        let prompts = if init.capabilities.prompts.is_some() {
            session.list_prompts().await.unwrap_or_else(|e| {
                warn!(server = %session.server_name(), error = %e, "Failed to list prompts");
                Vec::new()
            })
        } else {
            Vec::new()
        };

        let resources = if init.capabilities.resources.is_some() {
            session.list_resources().await.unwrap_or_else(|e| {
                warn!(server = %session.server_name(), error = %e, "Failed to list resources");
                Vec::new()
            })
        } else {
            Vec::new()
        };

        Ok(Discovered {
            tools,
            prompts,
            resources,
        })
    }

    fn commit(
        &mut self,
        server_name: &str,
        session: Arc<dyn McpSession>,
        discovered: Discovered,
    ) -> RegistrationOutcome {
        let index = self.servers.len();
        let tool_names: Vec<String> = discovered.tools.iter().map(|t| t.name.clone()).collect();
        let prompt_names: Vec<String> =
            discovered.prompts.iter().map(|p| p.name.clone()).collect();
        let resource_uris: Vec<String> =
            discovered.resources.iter().map(|r| r.uri.clone()).collect();

        self.servers.push(ServerEntry {
            name: server_name.to_string(),
            session,
            tools: tool_names.clone(),
            prompts: prompt_names.clone(),
            resources: resource_uris.clone(),
        });

        for tool in &discovered.tools {
            if let Some(previous) = self.tools.insert(tool.name.clone(), index) {
                warn!(
                    tool = %tool.name,
                    previous = %self.servers[previous].name,
                    server = %server_name,
                    "Tool name registered twice, later server wins"
                );
            }
            self.catalog.upsert_tool(tool.descriptor());
        }

        for prompt in &discovered.prompts {
            if let Some(previous) = self.prompts.insert(prompt.name.clone(), index) {
                warn!(
                    prompt = %prompt.name,
                    previous = %self.servers[previous].name,
                    server = %server_name,
                    "Prompt name registered twice, later server wins"
                );
            }
            self.catalog.upsert_prompt(PromptDescriptor::from(prompt));
        }

        for uri in &resource_uris {
            self.resources.insert(uri.clone(), index);
        }

        info!(
            server = %server_name,
            tools = tool_names.len(),
            prompts = prompt_names.len(),
            resources = resource_uris.len(),
            "MCP server registered"
        );

        RegistrationOutcome::Connected {
            tools: tool_names,
            prompts: prompt_names.len(),
            resources: resource_uris.len(),
        }
    }

    /// A resolver over this registry's mappings.
    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(self)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Names of the registered servers, in registration order.
    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    fn entry(&self, server_name: &str) -> Option<&ServerEntry> {
        self.servers.iter().find(|s| s.name == server_name)
    }

    /// Tool names a server advertised, including any a later server took over.
    pub fn tools_of(&self, server_name: &str) -> Option<&[String]> {
        self.entry(server_name).map(|s| s.tools.as_slice())
    }

    pub fn prompts_of(&self, server_name: &str) -> Option<&[String]> {
        self.entry(server_name).map(|s| s.prompts.as_slice())
    }

    /// Resource URIs a server advertised, if the server is registered.
    pub fn resources_of(&self, server_name: &str) -> Option<&[String]> {
        self.entry(server_name).map(|s| s.resources.as_slice())
    }

    /// Close every session, newest first. Errors are logged, not returned.
    pub async fn shutdown(&self) {
        for server in self.servers.iter().rev() {
            match server.session.close().await {
                Ok(()) => debug!(server = %server.name, "MCP session closed"),
                Err(e) => warn!(server = %server.name, error = %e, "Failed to close MCP session"),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::session::StdioConnector;

    #[test]
    fn test_registry_empty() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.server_count(), 0);
        assert!(registry.catalog().tools().is_empty());
        assert!(registry.server_names().is_empty());
    }

    #[tokio::test]
    async fn test_register_nonexistent_server() {
        let mut registry = SessionRegistry::new();
        let config = McpServerConfig::new("/nonexistent/mcp-server");
        let outcome = registry.register("ghost", &config, &StdioConnector).await;
        assert!(matches!(outcome, RegistrationOutcome::Failed(ParleyError::Mcp(_))));
        assert_eq!(registry.server_count(), 0);
    }
}
