use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blogsmith::api::{self, AppState};
use blogsmith::definitions::CrewDefinition;
use blogsmith::factory::{research_tool_runtime, CrewFactory};
use blogsmith::mcp::{self, McpClient, McpServer};
use blogsmith::storage::InMemoryRunStore;
use blogsmith::{Config, CrewEvent, Variant};

#[derive(Parser)]
#[command(name = "blogsmith")]
#[command(about = "Research a topic with a crew of LLM agents and write a blog post", long_about = None)]
#[command(version)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the web UI
    Serve {
        #[arg(long, default_value_t = 8501)]
        port: u16,
        #[arg(long, value_enum, default_value_t = Variant::Direct)]
        variant: Variant,
        /// Crew definition YAML replacing the built-in crew
        #[arg(long)]
        crew: Option<PathBuf>,
    },
    /// Write one blog post and print or save it
    Generate {
        #[arg(help = "Topic of the blog post")]
        topic: String,
        #[arg(long, value_enum, default_value_t = Variant::Direct)]
        variant: Variant,
        #[arg(long)]
        crew: Option<PathBuf>,
        /// Write the Markdown here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Serve the research tools over MCP
    ToolServer {
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Bearer token clients must present
        #[arg(long)]
        token: Option<String>,
    },
    /// List a tool server's tools and call each with a sample request
    ProbeTools {
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            port,
            variant,
            crew,
        } => serve(config, port, variant, crew.as_deref()).await?,
        Commands::Generate {
            topic,
            variant,
            crew,
            output,
        } => generate(config, &topic, variant, crew.as_deref(), output.as_deref()).await?,
        Commands::ToolServer { port, token } => tool_server(config, port, token).await?,
        Commands::ProbeTools { url } => probe_tools(config, url).await?,
    }

    Ok(())
}

fn load_crew(path: Option<&Path>) -> Result<Option<CrewDefinition>> {
    path.map(CrewDefinition::from_yaml_file).transpose()
}

async fn serve(config: Config, port: u16, variant: Variant, crew: Option<&Path>) -> Result<()> {
    let factory = CrewFactory::from_config(config, variant, load_crew(crew)?)?;
    log::info!(
        "serving the {} crew '{}' with {}",
        variant.as_str(),
        factory.definition().name,
        factory.model()
    );

    let state = AppState::new(Arc::new(InMemoryRunStore::new()), Arc::new(factory));
    api::serve(state, port).await
}

async fn generate(
    config: Config,
    topic: &str,
    variant: Variant,
    crew: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(anyhow!("Please enter a topic for the blog post."));
    }

    let factory = CrewFactory::from_config(config, variant, load_crew(crew)?)?;
    let progress = |event: CrewEvent| eprintln!("{}", event.describe());
    let result = factory.generate(topic, &progress).await?;

    match output {
        Some(path) => {
            std::fs::write(path, &result.raw)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Saved {}", path.display());
        }
        None => println!("{}", result.raw),
    }
    eprintln!("Blog post generated successfully!");
    Ok(())
}

async fn tool_server(config: Config, port: u16, token: Option<String>) -> Result<()> {
    let runtime = research_tool_runtime(&config)?;
    let server = McpServer::new(runtime).with_bearer_token(token);
    mcp::serve(server, port).await
}

async fn probe_tools(config: Config, url: Option<String>) -> Result<()> {
    let url = url.unwrap_or_else(|| config.mcp.endpoint());
    let client = McpClient::connect(url, config.mcp_token().map(str::to_string)).await?;

    println!("Available tools:");
    let tools = client.list_tools().await?;
    for tool in &tools {
        println!("- {}: {}", tool.name, tool.description.as_deref().unwrap_or(""));
    }

    for tool in &tools {
        println!("\n{}\nTesting: {}...", "=".repeat(50), tool.name);
        match client.call_tool(&tool.name, sample_arguments(&tool.name)).await {
            Ok(result) if result.is_error == Some(true) => {
                println!("Error: {}", mcp::joined_text(&result))
            }
            Ok(result) => println!("{}", pretty(&mcp::joined_text(&result))),
            Err(e) => println!("Error calling {}: {}", tool.name, e),
        }
    }
    Ok(())
}

fn sample_arguments(tool: &str) -> Value {
    match tool {
        "multi_engine_search" | "web_search" => json!({
            "query": "AI in healthcare",
            "engine": "google",
            "location": "United States",
        }),
        "extract_web_content_from_links" => json!({
            "urls": [
                "https://pmc.ncbi.nlm.nih.gov/articles/PMC8285156/",
                "https://www.foreseemed.com/artificial-intelligence-in-healthcare",
                "https://news.harvard.edu/gazette/story/2025/03/how-ai-is-transforming-medicine-healthcare/",
            ],
        }),
        "keyword_research" => json!({ "topic": "home automation" }),
        _ => json!({}),
    }
}

fn pretty(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| text.to_string())
}
