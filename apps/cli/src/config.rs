//! CLI configuration loading and merging.

use anyhow::{Context, Result};
use crag_orchestrator::{PipelineKind, WorkflowConfig};
use std::path::Path;

use crate::Args;

/// Config file picked up from the working directory when `--config` is absent.
pub const LOCAL_CONFIG_FILE: &str = "crag.toml";

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments
/// 2. Environment variables (including `.env`, loaded by `main`)
/// 3. Config file (`--config`, else `./crag.toml` if present)
/// 4. Defaults
pub fn resolve(args: &Args) -> Result<WorkflowConfig> {
    let mut config = match &args.config {
        Some(path) => WorkflowConfig::load_from_toml(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None if Path::new(LOCAL_CONFIG_FILE).is_file() => WorkflowConfig::load_from_toml(LOCAL_CONFIG_FILE)
            .with_context(|| format!("failed to load {LOCAL_CONFIG_FILE}"))?,
        None => WorkflowConfig::default(),
    };

    config.apply_env();
    apply_flags(&mut config, args)?;
    config.validate()?;
    Ok(config)
}

fn apply_flags(config: &mut WorkflowConfig, args: &Args) -> Result<()> {
    if let Some(pipeline) = &args.pipeline {
        config.workflow.pipeline = pipeline.parse::<PipelineKind>()?;
    }
    if let Some(secs) = args.timeout {
        config.workflow.run_timeout_secs = secs;
    }
    if let Some(top_k) = args.top_k {
        config.retriever.top_k = top_k;
    }
    if let Some(provider) = &args.model {
        config.model.provider.clone_from(provider);
    }
    if let Some(model_id) = &args.model_id {
        config.model.model_id.clone_from(model_id);
    }
    Ok(())
}
