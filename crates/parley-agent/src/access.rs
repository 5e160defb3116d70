//! Direct resource reads and prompt-template queries.

use crate::events::AgentEvent;
use crate::runner::{AgentRunner, Conversation};
use parley_core::ParleyResult;
use parley_mcp::protocol::ResourceContents;
use parley_mcp::{PromptDescriptor, SessionRegistry};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Read `uri` from its owning server.
///
/// Returns the first content item's text, or `None` when the server sent
/// nothing. Binary items render as a placeholder naming their MIME type.
pub async fn fetch_resource(registry: &SessionRegistry, uri: &str) -> ParleyResult<Option<String>> {
    let session = registry.dispatcher().resolve_resource(uri)?;
    let result = session.read_resource(uri).await?;
    debug!(uri = %uri, server = %session.server_name(), items = result.contents.len(), "Resource read");
    Ok(result.contents.first().map(render_contents))
}

fn render_contents(item: &ResourceContents) -> String {
    match (&item.text, &item.blob) {
        (Some(text), _) => text.clone(),
        (None, Some(_)) => format!(
            "[binary content: {}]",
            item.mime_type.as_deref().unwrap_or("application/octet-stream")
        ),
        (None, None) => String::new(),
    }
}

/// Prompt templates advertised by the connected servers.
pub fn list_prompts(registry: &SessionRegistry) -> &[PromptDescriptor] {
    registry.catalog().prompts()
}

impl AgentRunner {
    /// Instantiate a prompt template and answer it as a fresh query.
    ///
    /// A prompt no server owns is `NotFound` and the model is never called.
    /// `Ok(None)` means the template produced no messages.
    pub async fn run_prompt(
        &self,
        name: &str,
        arguments: &BTreeMap<String, String>,
    ) -> ParleyResult<Option<Conversation>> {
        let session = self.registry().dispatcher().resolve_prompt(name)?;
        let result = session.get_prompt(name, arguments).await?;

        let Some(first) = result.messages.first() else {
            info!(prompt = %name, "Prompt produced no messages");
            return Ok(None);
        };
        let text = first.content.text();

        self.emit(AgentEvent::PromptStarted {
            name: name.to_string(),
        });
        self.process_query(&text).await.map(Some)
    }
}
