// MCP (Model Context Protocol) server for the project coordinator
// Exposes project tracking tools to agent clients over stdio

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
pub use tools::{build_registry, Tool, ToolRegistry};
