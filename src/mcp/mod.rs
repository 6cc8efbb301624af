//! Model Context Protocol over streamable HTTP, built on `rmcp`: the research
//! tool server and the client the crews use to reach it.

pub mod client;
pub mod error;
pub mod server;

pub use client::{joined_text, McpClient};
pub use error::McpError;
pub use rmcp::model::{CallToolResult, Tool as ToolDescriptor};
pub use server::{serve, McpServer};
