use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{Tool, ToolContext, ToolResult};
use crate::mcp::{joined_text, McpClient, ToolDescriptor};

/// A tool that lives on a remote MCP server.
pub struct RemoteTool {
    client: Arc<McpClient>,
    descriptor: ToolDescriptor,
}

impl RemoteTool {
    pub fn new(client: Arc<McpClient>, descriptor: ToolDescriptor) -> Self {
        Self { client, descriptor }
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        self.descriptor.description.as_deref().unwrap_or("")
    }

    fn parameters_schema(&self) -> Value {
        Value::Object((*self.descriptor.input_schema).clone())
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> Result<ToolResult> {
        log::debug!(
            "remote call {} for task '{}' via {}",
            self.descriptor.name,
            context.task,
            self.client.url()
        );

        let result = self.client.call_tool(&self.descriptor.name, params).await?;
        let text = joined_text(&result);

        if result.is_error == Some(true) {
            return Ok(ToolResult::failed(text));
        }

        // Tool servers return JSON as text; keep it structured when it parses.
        let output = serde_json::from_str(&text).unwrap_or_else(|_| json!(text));
        Ok(ToolResult::ok(output))
    }
}
