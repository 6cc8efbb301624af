use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{Tool, ToolContext, ToolResult};
use crate::definitions::ToolType;
use crate::providers::search::{SearchOptions, SearchProvider};

pub struct WebSearchTool {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        ToolType::WebSearch.as_str()
    }

    fn description(&self) -> &str {
        "Search the internet for information. Returns top results with titles, links and snippets."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default: 10)",
                    "default": 10
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> Result<ToolResult> {
        let query = params["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| anyhow!("Missing query"))?;
        let num_results = params["num_results"].as_u64().unwrap_or(10) as usize;

        let results = self
            .provider
            .search(query, &SearchOptions::with_count(num_results))
            .await?;

        Ok(ToolResult::ok(json!({
            "results": results.iter().map(|r| json!({
                "title": r.title,
                "url": r.url,
                "snippet": r.snippet,
            })).collect::<Vec<_>>()
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::search::MockSearchProvider;

    #[tokio::test]
    async fn test_web_search_tool() {
        let tool = WebSearchTool::new(Arc::new(MockSearchProvider::new()));
        let context = ToolContext::new("researcher", "research");

        let result = tool
            .execute(json!({"query": "edge ai", "num_results": 4}), &context)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output["results"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_web_search_requires_query() {
        let tool = WebSearchTool::new(Arc::new(MockSearchProvider::new()));
        let context = ToolContext::default();
        assert!(tool.execute(json!({"query": "  "}), &context).await.is_err());
        assert!(tool.execute(json!({}), &context).await.is_err());
    }
}
