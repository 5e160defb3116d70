//! Routes a capability name or resource URI to the session that owns it.

use crate::registry::SessionRegistry;
use crate::session::McpSession;
use parley_core::{CapabilityKind, ParleyError, ParleyResult};
use std::sync::Arc;
use tracing::debug;

/// Read-only resolver over a [`SessionRegistry`].
///
/// Misses are returned as [`ParleyError::NotFound`]; callers report them and
/// carry on.
#[derive(Clone, Copy)]
pub struct Dispatcher<'r> {
    registry: &'r SessionRegistry,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r SessionRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(
        &self,
        kind: CapabilityKind,
        identifier: &str,
    ) -> ParleyResult<&'r Arc<dyn McpSession>> {
        match kind {
            CapabilityKind::Tool => self.resolve_tool(identifier),
            CapabilityKind::Prompt => self.resolve_prompt(identifier),
            CapabilityKind::Resource => self.resolve_resource(identifier),
        }
    }

    pub fn resolve_tool(&self, name: &str) -> ParleyResult<&'r Arc<dyn McpSession>> {
        let registry: &'r SessionRegistry = self.registry;
        registry
            .tools
            .get(name)
            .map(move |&index| &registry.servers[index].session)
            .ok_or_else(|| ParleyError::not_found(CapabilityKind::Tool, name))
    }

    pub fn resolve_prompt(&self, name: &str) -> ParleyResult<&'r Arc<dyn McpSession>> {
        let registry: &'r SessionRegistry = self.registry;
        registry
            .prompts
            .get(name)
            .map(move |&index| &registry.servers[index].session)
            .ok_or_else(|| ParleyError::not_found(CapabilityKind::Prompt, name))
    }

    /// Exact URI match first; otherwise the first server (in registration
    /// order) owning any resource under the same `scheme://`.
    pub fn resolve_resource(&self, uri: &str) -> ParleyResult<&'r Arc<dyn McpSession>> {
        let registry: &'r SessionRegistry = self.registry;
        if let Some(&index) = registry.resources.get(uri) {
            return Ok(&registry.servers[index].session);
        }

        let Some(scheme) = uri_scheme(uri) else {
            return Err(ParleyError::not_found(CapabilityKind::Resource, uri));
        };

        registry
            .servers
            .iter()
            .find(|server| {
                server
                    .resources
                    .iter()
                    .any(|owned| uri_scheme(owned) == Some(scheme))
            })
            .map(move |server| {
                debug!(uri = %uri, server = %server.name, "Resolved resource by scheme");
                &server.session
            })
            .ok_or_else(|| ParleyError::not_found(CapabilityKind::Resource, uri))
    }
}

/// The scheme of a `scheme://rest` identifier, if it has one.
pub fn uri_scheme(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once("://")?;
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_scheme() {
        assert_eq!(uri_scheme("papers://folders"), Some("papers"));
        assert_eq!(uri_scheme("file:///tmp/a.txt"), Some("file"));
        assert_eq!(uri_scheme("git+ssh://host"), Some("git+ssh"));
        assert_eq!(uri_scheme("papers"), None);
        assert_eq!(uri_scheme("://nothing"), None);
        assert_eq!(uri_scheme("1x://bad"), None);
    }

    #[test]
    fn test_empty_registry_resolves_nothing() {
        let registry = SessionRegistry::new();
        let dispatcher = registry.dispatcher();
        assert!(dispatcher.resolve_tool("get_forecast").err().is_some_and(|e| e.is_not_found()));
        assert!(dispatcher.resolve_prompt("summarize").is_err());
        assert!(dispatcher.resolve_resource("papers://quantum").is_err());
    }
}
