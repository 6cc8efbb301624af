use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use super::extract_content::ExtractWebContentTool;
use super::keyword_research::KeywordResearchTool;
use super::multi_engine_search::MultiEngineSearchTool;
use super::remote::RemoteTool;
use super::web_search::WebSearchTool;
use super::{Tool, ToolCall, ToolContext, ToolResult};
use crate::definitions::ToolType;
use crate::mcp::{McpClient, ToolDescriptor};
use crate::providers::search::{KeywordSource, SearchProvider};

pub struct ToolRuntime {
    tools: HashMap<String, Box<dyn Tool>>,
}

pub struct ToolConfig {
    /// Backs `web_search` and `multi_engine_search`.
    pub search_provider: Option<Arc<dyn SearchProvider>>,
    /// Backs `keyword_research`.
    pub keyword_source: Option<Arc<dyn KeywordSource>>,
    pub fetch_timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            search_provider: None,
            keyword_source: None,
            fetch_timeout_secs: 30,
        }
    }
}

impl ToolRuntime {
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// In-process tools for whatever providers are configured.
    pub fn new(config: ToolConfig) -> Result<Self> {
        let mut runtime = Self::empty();

        // Register search tools if provider available
        if let Some(search_provider) = config.search_provider {
            runtime.register(Box::new(WebSearchTool::new(search_provider.clone())));
            runtime.register(Box::new(MultiEngineSearchTool::new(search_provider)));
        }

        if let Some(keyword_source) = config.keyword_source {
            runtime.register(Box::new(KeywordResearchTool::new(keyword_source)));
        }

        runtime.register(Box::new(ExtractWebContentTool::with_timeout(
            config.fetch_timeout_secs,
        )?));

        Ok(runtime)
    }

    /// Proxies for every tool the remote server lists.
    pub async fn from_remote(client: Arc<McpClient>) -> Result<Self> {
        let descriptors = client.list_tools().await?;
        if descriptors.is_empty() {
            return Err(anyhow!("Tool server at {} lists no tools", client.url()));
        }

        let mut runtime = Self::empty();
        for descriptor in descriptors {
            runtime.register(Box::new(RemoteTool::new(client.clone(), descriptor)));
        }
        Ok(runtime)
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Drops every tool not in `allowed`.
    pub fn restricted_to(mut self, allowed: &[ToolType]) -> Self {
        self.tools
            .retain(|name, _| allowed.iter().any(|t| t.as_str() == name.as_str()));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schemas of the allowed tools that are actually registered.
    pub fn get_schemas(&self, allowed: &[ToolType]) -> Vec<Value> {
        allowed
            .iter()
            .filter_map(|t| self.tools.get(t.as_str()))
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema(),
                })
            })
            .collect()
    }

    /// MCP listings of every registered tool, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(&name))
            .map(|tool| ToolDescriptor {
                name: Cow::Owned(tool.name().to_string()),
                title: None,
                description: Some(Cow::Owned(tool.description().to_string())),
                input_schema: Arc::new(
                    tool.parameters_schema()
                        .as_object()
                        .cloned()
                        .unwrap_or_default(),
                ),
                output_schema: None,
                annotations: None,
                execution: None,
                icons: None,
                meta: None,
            })
            .collect()
    }

    pub async fn execute(&self, tool_call: &ToolCall, context: &ToolContext) -> Result<ToolResult> {
        let tool = self
            .tools
            .get(&tool_call.name)
            .ok_or_else(|| anyhow!("Unknown tool: {}", tool_call.name))?;

        tool.execute(tool_call.params.clone(), context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::search::{MockKeywordSource, MockSearchProvider};

    fn full_config() -> ToolConfig {
        ToolConfig {
            search_provider: Some(Arc::new(MockSearchProvider::new())),
            keyword_source: Some(Arc::new(MockKeywordSource::default())),
            fetch_timeout_secs: 5,
        }
    }

    #[test]
    fn test_runtime_without_providers_has_extraction_only() {
        let runtime = ToolRuntime::new(ToolConfig::default()).unwrap();
        assert_eq!(runtime.names(), vec!["extract_web_content_from_links"]);
    }

    #[test]
    fn test_runtime_with_all_providers() {
        let runtime = ToolRuntime::new(full_config()).unwrap();
        assert_eq!(runtime.names().len(), 4);
        for tool in ToolType::all() {
            assert!(runtime.contains(tool.as_str()));
        }
    }

    #[test]
    fn test_restricted_to_research_suite() {
        let runtime = ToolRuntime::new(full_config())
            .unwrap()
            .restricted_to(&ToolType::research_suite());
        assert!(!runtime.contains("web_search"));
        assert_eq!(runtime.descriptors().len(), 3);
    }

    #[test]
    fn test_get_schemas_skips_unregistered() {
        let runtime = ToolRuntime::new(ToolConfig::default()).unwrap();
        let schemas = runtime.get_schemas(&[ToolType::WebSearch, ToolType::ExtractWebContent]);
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0]["name"], "extract_web_content_from_links");
        assert!(schemas[0]["parameters"]["properties"]["urls"].is_object());
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let runtime = ToolRuntime::empty();
        let call = ToolCall {
            name: "nope".to_string(),
            params: json!({}),
        };
        let err = runtime
            .execute(&call, &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown tool"));
    }
}
