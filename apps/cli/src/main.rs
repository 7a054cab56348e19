//! crag CLI - answer a question from local documents and the web
//!
//! This CLI provides a `crag` command that builds a workflow from flags, the
//! environment, and an optional TOML file, answers one query, and prints the
//! result.

mod config;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crag_abstraction::{LanguageModel, Retriever, RetrieverOptions, SearchClient};
use crag_orchestrator::{PipelineKind, Workflow, WorkflowConfig, WorkflowRequest};
use crag_providers::{FirecrawlClient, KeywordRetriever, ModelFactory, ModelKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

/// crag - corrective retrieval-augmented answering
///
/// Retrieves passages from a document directory, grades them, searches the
/// web when some are off-topic, and answers with the gathered context.
#[derive(Parser, Debug)]
#[command(name = "crag", author, version, about = "Corrective retrieval-augmented answering")]
pub struct Args {
    /// The question to answer
    query: Option<String>,

    /// Directory of .txt/.md documents to retrieve from
    #[arg(short, long)]
    docs: Option<PathBuf>,

    /// Config file (defaults to ./crag.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pipeline to run (corrective, linear)
    #[arg(short, long)]
    pipeline: Option<String>,

    /// Model provider (openrouter, mock)
    #[arg(short, long)]
    model: Option<String>,

    /// Provider model identifier
    #[arg(long)]
    model_id: Option<String>,

    /// Passages to retrieve
    #[arg(long)]
    top_k: Option<usize>,

    /// Run deadline in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the response as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::resolve(&args)?;
    let workflow = build_workflow(config, &args)?;

    let request = WorkflowRequest {
        query_str: args.query.clone(),
        retriever_kwargs: RetrieverOptions::default(),
    };
    info!(pipeline = %workflow.pipeline_kind(), "Answering query");

    match workflow.invoke(request).await {
        Ok(response) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.result);
            }
            Ok(())
        }
        Err(failure) => {
            if args.json {
                eprintln!("{}", serde_json::to_string_pretty(&failure)?);
            } else {
                eprintln!("Error: {failure}");
            }
            std::process::exit(1);
        }
    }
}

fn build_workflow(config: WorkflowConfig, args: &Args) -> Result<Workflow> {
    let model = build_model(&config)?;
    let retriever: Arc<dyn Retriever> = match &args.docs {
        Some(dir) => Arc::new(
            KeywordRetriever::load_dir(dir).with_context(|| format!("failed to load documents from {}", dir.display()))?,
        ),
        None => Arc::new(KeywordRetriever::default()),
    };

    let mut builder = Workflow::builder(config.clone()).model(model).retriever(retriever);
    if config.workflow.pipeline == PipelineKind::Corrective {
        builder = builder.search(build_search(&config)?);
    }
    Ok(builder.build()?)
}

fn build_model(config: &WorkflowConfig) -> Result<Arc<dyn LanguageModel>> {
    let kind: ModelKind = config.model.provider.parse()?;
    debug!(provider = ?kind, model_id = %config.model.model_id, "Building model");
    Ok(ModelFactory::create(
        kind,
        config.model.model_id.clone(),
        config.model.api_key.clone(),
        config.model.base_url.clone(),
    )?)
}

fn build_search(config: &WorkflowConfig) -> Result<Arc<dyn SearchClient>> {
    let Some(api_key) = config.search.api_key.clone() else {
        bail!("the corrective pipeline needs FIRECRAWL_API_KEY (or [search] api_key)");
    };
    let client = FirecrawlClient::new(api_key).with_timeout_ms(config.search.timeout_ms);
    let client = match &config.search.base_url {
        Some(url) => client.with_base_url(url.clone()),
        None => client,
    };
    Ok(Arc::new(client))
}
