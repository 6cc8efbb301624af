pub mod extract_content;
pub mod keyword_research;
pub mod multi_engine_search;
pub mod remote;
pub mod runtime;
pub mod web_search;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::types::RunId;

#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub run_id: Option<RunId>,
    pub agent: String,
    pub task: String,
}

impl ToolContext {
    pub fn new(agent: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            run_id: None,
            agent: agent.into(),
            task: task.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: Value,
}

impl ToolResult {
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: json!({ "error": message.into() }),
        }
    }

    /// The output as the text handed back to a model.
    pub fn to_text(&self) -> String {
        match &self.output {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, params: Value, context: &ToolContext) -> Result<ToolResult>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub params: Value,
}
