use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{Tool, ToolContext, ToolResult};
use crate::definitions::ToolType;
use crate::providers::search::KeywordSource;

const MAX_SUGGESTIONS: usize = 5;

/// Autocomplete suggestions for a topic, ranked by their latest Google Trends interest.
pub struct KeywordResearchTool {
    source: Arc<dyn KeywordSource>,
}

impl KeywordResearchTool {
    pub fn new(source: Arc<dyn KeywordSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for KeywordResearchTool {
    fn name(&self) -> &str {
        ToolType::KeywordResearch.as_str()
    }

    fn description(&self) -> &str {
        "Automate keyword research to find high-potential keywords based on a topic, using autocomplete and trends."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": {
                    "type": "string",
                    "description": "Blog topic to research keywords for."
                }
            },
            "required": ["topic"]
        })
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> Result<ToolResult> {
        let topic = params["topic"]
            .as_str()
            .ok_or_else(|| anyhow!("Missing topic"))?;

        let suggestions: Vec<String> = self
            .source
            .autocomplete(topic)
            .await?
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .collect();

        if suggestions.is_empty() {
            return Ok(ToolResult::ok(json!([
                { "error": "Could not fetch keyword suggestions." }
            ])));
        }

        let timeline = self.source.trends(&suggestions).await?;
        if timeline.is_none() {
            log::info!("no trends data for '{}', scores unavailable", topic);
        }

        let keywords: Vec<Value> = suggestions
            .iter()
            .enumerate()
            .map(|(i, keyword)| {
                let score = timeline
                    .as_ref()
                    .and_then(|t| t.latest_value(i))
                    .cloned()
                    .unwrap_or_else(|| json!("N/A"));
                json!({
                    "keyword": keyword,
                    "relative_popularity_score": score,
                })
            })
            .collect();

        Ok(ToolResult::ok(Value::Array(keywords)))
    }
}
