//! Server launch configuration (`server_config.json`).

use parley_core::{ParleyError, ParleyResult};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Configuration for a single MCP server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl McpServerConfig {
    /// A config that runs `command` with no arguments or extra environment.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// A configured server together with the name it is registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedServerConfig {
    pub name: String,
    pub config: McpServerConfig,
}

/// The whole configuration file: `{"mcpServers": {name: config, ...}}`.
///
/// Servers keep the order they appear in the file, which is the order they
/// are registered in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServersConfig {
    #[serde(rename = "mcpServers", default, deserialize_with = "ordered_servers")]
    pub servers: Vec<NamedServerConfig>,
}

impl ServersConfig {
    /// Parse a configuration document.
    pub fn from_json(source: &str) -> ParleyResult<Self> {
        serde_json::from_str(source)
            .map_err(|e| ParleyError::Config(format!("Invalid server configuration: {e}")))
    }

    /// Read and parse the configuration file at `path`.
    pub async fn load(path: &Path) -> ParleyResult<Self> {
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            ParleyError::Config(format!(
                "Failed to read server configuration '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&source)
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

fn ordered_servers<'de, D>(deserializer: D) -> Result<Vec<NamedServerConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ServersVisitor;

    impl<'de> Visitor<'de> for ServersVisitor {
        type Value = Vec<NamedServerConfig>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of server name to launch configuration")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut servers: Vec<NamedServerConfig> =
                Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, config)) = map.next_entry::<String, McpServerConfig>()? {
                if servers.iter().any(|s| s.name == name) {
                    return Err(de::Error::custom(format!("duplicate server name '{name}'")));
                }
                servers.push(NamedServerConfig { name, config });
            }
            Ok(servers)
        }
    }

    deserializer.deserialize_map(ServersVisitor)
}
