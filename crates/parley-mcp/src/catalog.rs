use crate::protocol::{McpPromptArgument, McpPromptDef};
use parley_core::ToolDescriptor;
use serde::Serialize;

/// A prompt template as listed by `/prompts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptDescriptor {
    pub name: String,
    pub description: String,
    pub arguments: Vec<McpPromptArgument>,
}

impl From<&McpPromptDef> for PromptDescriptor {
    fn from(def: &McpPromptDef) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            arguments: def.arguments.clone(),
        }
    }
}

/// Aggregated view of everything the connected servers advertise.
///
/// Names are unique: registering a name that is already present replaces
/// the earlier entry in place, mirroring the registry's last-writer-wins
/// ownership.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<ToolDescriptor>,
    prompts: Vec<PromptDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tool. Returns `true` if an entry was replaced.
    pub fn upsert_tool(&mut self, descriptor: ToolDescriptor) -> bool {
        match self.tools.iter_mut().find(|t| t.name == descriptor.name) {
            Some(existing) => {
                *existing = descriptor;
                true
            }
            None => {
                self.tools.push(descriptor);
                false
            }
        }
    }

    /// Add or replace a prompt. Returns `true` if an entry was replaced.
    pub fn upsert_prompt(&mut self, descriptor: PromptDescriptor) -> bool {
        match self.prompts.iter_mut().find(|p| p.name == descriptor.name) {
            Some(existing) => {
                *existing = descriptor;
                true
            }
            None => {
                self.prompts.push(descriptor);
                false
            }
        }
    }

    /// Tool descriptors in registration order, ready for a model request.
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn prompts(&self) -> &[PromptDescriptor] {
        &self.prompts
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, description: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            parameters_schema: serde_json::json!({"type": "object"}),
        }
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut catalog = Catalog::new();
        assert!(!catalog.upsert_tool(tool("search_papers", "v1")));
        assert!(!catalog.upsert_tool(tool("extract_info", "v1")));
        assert!(catalog.upsert_tool(tool("search_papers", "v2")));

        assert_eq!(catalog.tool_names(), vec!["search_papers", "extract_info"]);
        assert_eq!(catalog.tool("search_papers").map(|t| t.description.as_str()), Some("v2"));
    }

    #[test]
    fn test_prompts_are_separate_from_tools() {
        let mut catalog = Catalog::new();
        catalog.upsert_tool(tool("summarize", "tool"));
        catalog.upsert_prompt(PromptDescriptor {
            name: "summarize".to_string(),
            description: "prompt".to_string(),
            arguments: vec![],
        });
        assert_eq!(catalog.tools().len(), 1);
        assert_eq!(catalog.prompts().len(), 1);
    }
}
