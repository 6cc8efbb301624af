use rmcp::model::{CallToolRequestParams, CallToolResult, Content, RawContent, Tool as McpTool};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::streamable_http_client::{
    StreamableHttpClientTransport, StreamableHttpClientTransportConfig,
};
use rmcp::ServiceExt;
use serde_json::Value;
use std::borrow::Cow;

use super::error::McpError;

/// Client half of the streamable-HTTP transport.
///
/// Holds the running `rmcp` service; dropping the client ends the session.
pub struct McpClient {
    service: RunningService<RoleClient, ()>,
    url: String,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient").field("url", &self.url).finish_non_exhaustive()
    }
}

impl McpClient {
    /// Opens a session. `bearer` is sent as `Authorization: Bearer <token>`.
    pub async fn connect(url: impl Into<String>, bearer: Option<String>) -> Result<Self, McpError> {
        let url = url.into();

        let mut config = StreamableHttpClientTransportConfig::with_uri(url.clone());
        if let Some(token) = bearer.filter(|t| !t.is_empty()) {
            config = config.auth_header(token);
        }
        let transport = StreamableHttpClientTransport::from_config(config);

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| McpError::Initialization {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let client = Self { service, url };
        log::info!(
            "connected to tool server {} ({})",
            client.url,
            client.server_name().unwrap_or_else(|| "unnamed".to_string())
        );
        Ok(client)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn server_name(&self) -> Option<String> {
        self.service
            .peer_info()
            .map(|info| info.server_info.name.clone())
    }

    pub async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        Ok(self.service.list_all_tools().await?)
    }

    /// Calls `name`. Non-object `arguments` are sent as no arguments.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let params = CallToolRequestParams {
            meta: None,
            name: Cow::Owned(name.to_string()),
            arguments: arguments.as_object().cloned(),
            task: None,
        };
        Ok(self.service.call_tool(params).await?)
    }

    pub async fn close(self) -> Result<(), McpError> {
        self.service
            .cancel()
            .await
            .map_err(|e| McpError::Service(e.to_string()))?;
        Ok(())
    }
}

/// The text blocks of a tool result, joined by newlines.
pub fn joined_text(result: &CallToolResult) -> String {
    text_of(&result.content)
}

fn text_of(content: &[Content]) -> String {
    content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_text_skips_non_text_blocks() {
        let result = CallToolResult::success(vec![
            Content::text("[\"https://a\"]"),
            Content::image("aGk=", "image/png"),
            Content::text("done"),
        ]);
        assert_eq!(joined_text(&result), "[\"https://a\"]\ndone");
        assert_eq!(joined_text(&CallToolResult::success(vec![])), "");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let result = McpClient::connect("http://127.0.0.1:9/mcp", None).await;
        assert!(matches!(result, Err(McpError::Initialization { .. })));
    }
}
