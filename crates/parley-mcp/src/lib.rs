//! Model Context Protocol plumbing for parley.
//!
//! [`McpClient`] speaks JSON-RPC 2.0 to a server over the stdio of a child
//! process. [`SessionRegistry`] connects to every configured server and
//! records which tools, prompts, and resources each one owns;
//! [`Dispatcher`] routes a name or URI back to the owning [`McpSession`].

pub mod catalog;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod protocol;
pub mod registry;
pub mod session;

pub use catalog::{Catalog, PromptDescriptor};
pub use client::McpClient;
pub use config::{McpServerConfig, NamedServerConfig, ServersConfig};
pub use dispatch::{uri_scheme, Dispatcher};
pub use registry::{RegistrationOutcome, RegistrationReport, SessionRegistry};
pub use session::{McpSession, SessionConnector, StdioConnector};
