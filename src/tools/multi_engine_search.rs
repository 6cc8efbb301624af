use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{Tool, ToolContext, ToolResult};
use crate::definitions::ToolType;
use crate::providers::search::{SearchOptions, SearchProvider};

const MAX_LINKS: usize = 5;

/// Top article links for a query on a chosen engine, location and device.
pub struct MultiEngineSearchTool {
    provider: Arc<dyn SearchProvider>,
}

impl MultiEngineSearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for MultiEngineSearchTool {
    fn name(&self) -> &str {
        ToolType::MultiEngineSearch.as_str()
    }

    fn description(&self) -> &str {
        "Query a search engine and return the top 5 blog/article links based on a search query."
    }

    fn parameters_schema(&self) -> Value {
        let defaults = SearchOptions::default();
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "engine": {
                    "type": "string",
                    "description": "Search engine to use (e.g., 'google').",
                    "default": defaults.engine
                },
                "location": {
                    "type": "string",
                    "description": "Geographic location for the search.",
                    "default": defaults.location
                },
                "device": {
                    "type": "string",
                    "description": "Device type for the search (e.g., 'desktop', 'mobile').",
                    "default": defaults.device
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> Result<ToolResult> {
        let query = params["query"]
            .as_str()
            .ok_or_else(|| anyhow!("Missing query"))?;

        let defaults = SearchOptions::default();
        let text_or = |key: &str, fallback: String| {
            params[key]
                .as_str()
                .map(str::to_string)
                .unwrap_or(fallback)
        };
        let options = SearchOptions {
            engine: text_or("engine", defaults.engine),
            location: text_or("location", defaults.location),
            device: text_or("device", defaults.device),
            count: MAX_LINKS,
        };

        let links: Vec<String> = self
            .provider
            .search(query, &options)
            .await?
            .into_iter()
            .take(MAX_LINKS)
            .map(|r| r.url)
            .filter(|url| !url.is_empty())
            .collect();

        log::debug!("multi_engine_search '{}' on {} -> {} links", query, options.engine, links.len());

        Ok(ToolResult::ok(json!(links)))
    }
}
