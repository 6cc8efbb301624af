use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::Variant;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.clarifai.com/v2/ext/openai/v1";
pub const DIRECT_DEFAULT_MODEL: &str = "gcp/generate/models/gemini-2_5-pro";
pub const MCP_DEFAULT_MODEL: &str = "openai/chat-completion/models/gpt-4o";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const MCP_BASE_URL: &str = "https://api.clarifai.com/v2/ext/mcp/v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub serper_api_key: Option<String>,
    pub serpapi_api_key: Option<String>,
    pub mcp: McpEndpointConfig,
    pub fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpEndpointConfig {
    pub url: Option<String>,
    pub user_id: String,
    pub app_id: String,
    pub model_id: String,
    /// Bearer token for the tool server; falls back to the LLM key.
    pub token: Option<String>,
}

impl Default for McpEndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            user_id: "nperla".to_string(),
            app_id: "mcp-examples".to_string(),
            model_id: "blog_writing_search_mcp".to_string(),
            token: None,
        }
    }
}

impl McpEndpointConfig {
    pub fn endpoint(&self) -> String {
        self.url.clone().unwrap_or_else(|| {
            format!(
                "{}/users/{}/apps/{}/models/{}",
                MCP_BASE_URL, self.user_id, self.app_id, self.model_id
            )
        })
    }
}

impl Config {
    /// Loads an optional TOML file, then lets environment variables (and
    /// `.env`, if present) override it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| anyhow!("Failed to parse config TOML: {}", e))
    }

    fn apply_env(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(key) = var("CLARIFAI_PAT")
            .or_else(|| var("CLARIFAI_API"))
            .or_else(|| var("LLM_API_KEY"))
        {
            self.llm_api_key = Some(key);
        }
        if let Some(url) = var("LLM_BASE_URL") {
            self.llm_base_url = Some(url);
        }
        if let Some(model) = var("LLM_MODEL") {
            self.llm_model = Some(model);
        }
        if let Some(key) = var("SERPER_API_KEY") {
            self.serper_api_key = Some(key);
        }
        if let Some(key) = var("SERPAPI_API_KEY") {
            self.serpapi_api_key = Some(key);
        }
        if let Some(url) = var("MCP_SERVER_URL") {
            self.mcp.url = Some(url);
        }
        if let Some(user) = var("MCP_USER_ID") {
            self.mcp.user_id = user;
        }
        if let Some(app) = var("MCP_APP_ID") {
            self.mcp.app_id = app;
        }
        if let Some(model) = var("MCP_MODEL_ID") {
            self.mcp.model_id = model;
        }
        if let Some(token) = var("MCP_TOKEN") {
            self.mcp.token = Some(token);
        }
        if let Some(secs) = var("FETCH_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.fetch_timeout_secs = Some(secs);
        }
    }

    pub fn llm_base_url(&self) -> &str {
        self.llm_base_url.as_deref().unwrap_or(DEFAULT_LLM_BASE_URL)
    }

    pub fn llm_model(&self, variant: Variant) -> String {
        self.llm_model.clone().unwrap_or_else(|| {
            match variant {
                Variant::Direct => DIRECT_DEFAULT_MODEL,
                Variant::Mcp => MCP_DEFAULT_MODEL,
            }
            .to_string()
        })
    }

    /// SerpApi key used by the tool server. Existing deployments store it
    /// under `SERPER_API_KEY`, so that is accepted as a fallback.
    pub fn serpapi_key(&self) -> Option<&str> {
        self.serpapi_api_key
            .as_deref()
            .or(self.serper_api_key.as_deref())
    }

    pub fn fetch_timeout_secs(&self) -> u64 {
        self.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS)
    }

    pub fn mcp_token(&self) -> Option<&str> {
        self.mcp.token.as_deref().or(self.llm_api_key.as_deref())
    }

    pub fn require_llm_key(&self) -> Result<&str> {
        self.llm_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Please set CLARIFAI_PAT environment variable"))
    }

    /// Checks that every credential the variant needs is present.
    pub fn validate_for(&self, variant: Variant) -> Result<()> {
        self.require_llm_key()?;
        match variant {
            Variant::Direct => {
                if self.serper_api_key.is_none() {
                    return Err(anyhow!("Please set SERPER_API_KEY environment variable"));
                }
            }
            Variant::Mcp => {
                if self.mcp_token().is_none() {
                    return Err(anyhow!("Please set MCP_TOKEN or CLARIFAI_PAT environment variable"));
                }
            }
        }
        Ok(())
    }
}
