use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use placement_core::EngineConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use placement_server::{build_app, llm::LlmConfig, ServerOptions};
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Placement data file (.csv, .xlsx or .xls)
    #[arg(long, env = "PLACEMENT_DATA", default_value = "./data/placements.csv")]
    data: PathBuf,
    /// Engine configuration as JSON (floors, schema, index settings)
    #[arg(long, env = "PLACEMENT_CONFIG")]
    config: Option<PathBuf>,
    /// Host to bind
    #[arg(long, env = "PLACEMENT_HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PLACEMENT_PORT", default_value_t = 8080)]
    port: u16,
    /// Token required by admin endpoints
    #[arg(long, env = "ADMIN_TOKEN")]
    admin_token: Option<String>,
    /// OpenAI-compatible API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = placement_server::llm::DEFAULT_BASE_URL)]
    llm_base_url: String,
    #[arg(long, env = "LLM_MODEL", default_value = placement_server::llm::DEFAULT_MODEL)]
    llm_model: String,
    /// API key for the language model; GROQ_API_KEY is also honoured
    #[arg(long, env = "LLM_API_KEY")]
    llm_api_key: Option<String>,
}

fn engine_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else { return Ok(EngineConfig::default()) };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let api_key = args.llm_api_key.clone().or_else(|| std::env::var("GROQ_API_KEY").ok());
    let llm = api_key.map(|key| LlmConfig {
        base_url: args.llm_base_url.clone(),
        model: args.llm_model.clone(),
        ..LlmConfig::new(key)
    });
    let options = ServerOptions {
        data: args.data.clone(),
        engine: engine_config(args.config.as_ref())?,
        llm,
        admin_token: args.admin_token.clone(),
    };
    let app: Router = build_app(options)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, data = %args.data.display(), "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
