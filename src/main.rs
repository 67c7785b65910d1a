use anyhow::{Context, Result};
use apibridge::cli::{Cli, Commands, OutputFormat};
use apibridge::{
    utils, ApiSource, ArgumentMap, Settings, ToolAgent, ToolCapability, ToolDescriptor,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::new(),
    }
    .context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Tools { format } => handle_tools(&settings, format).await,
        Commands::Inspect {
            namespace,
            spec,
            server_url,
        } => handle_inspect(&settings, namespace, spec, server_url).await,
        Commands::Call { tool, args } => handle_call(&settings, tool, args).await,
    }
}

async fn build_agent(settings: &Settings) -> Result<ToolAgent> {
    let sources = settings.sources();
    if sources.is_empty() {
        utils::print_info("No APIs configured; add [[apis]] entries to the configuration");
    }

    let agent = ToolAgent::from_sources(
        settings.agent.clone(),
        &sources,
        &settings.import_options(),
    )
    .await?;
    Ok(agent)
}

async fn handle_tools(settings: &Settings, format: OutputFormat) -> Result<()> {
    let agent = build_agent(settings).await?;
    let tools = agent.list_tools();

    match format {
        OutputFormat::Json => print_json(&tools)?,
        OutputFormat::Text => {
            utils::print_header(&format!("{} ({} tools)", agent.name(), tools.len()));
            if !agent.metadata().description.is_empty() {
                utils::print_info(&agent.metadata().description);
            }
            for tool in &tools {
                println!();
                utils::print_tool(tool);
            }
        }
    }
    Ok(())
}

async fn handle_inspect(
    settings: &Settings,
    namespace: String,
    spec: String,
    server_url: Option<String>,
) -> Result<()> {
    let mut source = ApiSource::new(namespace, spec.as_str());
    source.server_url = server_url;

    let registry = source.import(&settings.import_options()).await?;
    utils::print_success(&format!(
        "Imported {} tools against {}",
        registry.len(),
        registry.server_url()
    ));

    print_json(&registry.descriptors())
}

async fn handle_call(settings: &Settings, tool: String, args: String) -> Result<()> {
    let args: ArgumentMap =
        serde_json::from_str(&args).context("--args must be a JSON object")?;
    let agent = build_agent(settings).await?;

    match agent.execute_tool(&tool, args).await {
        Ok(body) => {
            println!("{}", body);
            Ok(())
        }
        Err(e) => {
            utils::print_error(&format!("Tool {} failed: {}", tool, e));
            Err(e.into())
        }
    }
}

fn print_json(tools: &[ToolDescriptor]) -> Result<()> {
    let declarations: Vec<_> = tools.iter().map(ToolDescriptor::to_function_declaration).collect();
    println!("{}", serde_json::to_string_pretty(&declarations)?);
    Ok(())
}
