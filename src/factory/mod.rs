use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::definitions::{crew_for, CrewDefinition, ToolType};
use crate::engine::{Crew, CrewObserver, CrewOutput};
use crate::mcp::McpClient;
use crate::providers::search::{SerpApiClient, SerperSearchProvider};
use crate::providers::{LLMProvider, OpenAICompatibleProvider};
use crate::tools::runtime::{ToolConfig, ToolRuntime};
use crate::types::Variant;

enum Backend {
    /// Providers are created from configuration for every run.
    Live(Config),
    /// Providers supplied up front, shared by every run.
    Fixed {
        llm: Arc<dyn LLMProvider>,
        tools: Arc<ToolRuntime>,
    },
}

/// Builds ready-to-run crews for one variant.
pub struct CrewFactory {
    variant: Variant,
    definition: CrewDefinition,
    backend: Backend,
}

impl CrewFactory {
    /// Fails when a credential the variant needs is missing.
    pub fn from_config(
        config: Config,
        variant: Variant,
        definition: Option<CrewDefinition>,
    ) -> Result<Self> {
        config.validate_for(variant)?;
        let definition = definition.unwrap_or_else(|| crew_for(variant));
        definition.validate()?;

        Ok(Self {
            variant,
            definition,
            backend: Backend::Live(config),
        })
    }

    pub fn fixed(
        variant: Variant,
        definition: CrewDefinition,
        llm: Arc<dyn LLMProvider>,
        tools: Arc<ToolRuntime>,
    ) -> Self {
        Self {
            variant,
            definition,
            backend: Backend::Fixed { llm, tools },
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn definition(&self) -> &CrewDefinition {
        &self.definition
    }

    pub fn model(&self) -> String {
        match &self.backend {
            Backend::Live(config) => config.llm_model(self.variant),
            Backend::Fixed { llm, .. } => llm.model().to_string(),
        }
    }

    pub fn api_base(&self) -> Option<String> {
        match &self.backend {
            Backend::Live(config) => Some(config.llm_base_url().to_string()),
            Backend::Fixed { .. } => None,
        }
    }

    pub fn mcp_endpoint(&self) -> Option<String> {
        match (&self.backend, self.variant) {
            (Backend::Live(config), Variant::Mcp) => Some(config.mcp.endpoint()),
            _ => None,
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.definition
            .required_tools()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect()
    }

    pub async fn build(&self) -> Result<Crew> {
        let (llm, tools) = match &self.backend {
            Backend::Fixed { llm, tools } => (llm.clone(), tools.clone()),
            Backend::Live(config) => {
                let llm: Arc<dyn LLMProvider> = Arc::new(
                    OpenAICompatibleProvider::new(
                        config.require_llm_key()?.to_string(),
                        config.llm_model(self.variant),
                    )
                    .with_base_url(config.llm_base_url()),
                );
                let tools = live_tools(config, self.variant).await?;
                (llm, Arc::new(tools))
            }
        };

        Ok(Crew::new(self.definition.clone(), llm, tools))
    }

    /// Builds a crew and writes a post about `topic`.
    pub async fn generate(&self, topic: &str, observer: &dyn CrewObserver) -> Result<CrewOutput> {
        let crew = self.build().await?;
        let inputs = HashMap::from([("topic".to_string(), topic.trim().to_string())]);
        crew.kickoff_with(&inputs, observer).await
    }
}

async fn live_tools(config: &Config, variant: Variant) -> Result<ToolRuntime> {
    match variant {
        Variant::Direct => {
            let key = config
                .serper_api_key
                .clone()
                .ok_or_else(|| anyhow!("Please set SERPER_API_KEY environment variable"))?;
            ToolRuntime::new(ToolConfig {
                search_provider: Some(Arc::new(SerperSearchProvider::new(key))),
                keyword_source: None,
                fetch_timeout_secs: config.fetch_timeout_secs(),
            })
        }
        Variant::Mcp => {
            let client = McpClient::connect(
                config.mcp.endpoint(),
                config.mcp_token().map(str::to_string),
            )
            .await?;
            ToolRuntime::from_remote(Arc::new(client)).await
        }
    }
}

/// The three research tools served by `tool-server`, backed by SerpApi.
pub fn research_tool_runtime(config: &Config) -> Result<ToolRuntime> {
    let key = config
        .serpapi_key()
        .ok_or_else(|| anyhow!("Please set SERPAPI_API_KEY environment variable"))?;
    let serpapi = Arc::new(SerpApiClient::new(key.to_string()));

    let runtime = ToolRuntime::new(ToolConfig {
        search_provider: Some(serpapi.clone()),
        keyword_source: Some(serpapi),
        fetch_timeout_secs: config.fetch_timeout_secs(),
    })?;
    Ok(runtime.restricted_to(&ToolType::research_suite()))
}
