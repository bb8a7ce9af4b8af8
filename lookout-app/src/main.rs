use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use lookout_common::observability::{LogConfig, init_logging};
use lookout_config::{LookoutConfig, LookoutConfigLoader, default_config_path};
use lookout_llm::ensure_llm_ready;
use lookout_llm::summarize::LlmSummarizer;
use lookout_web::{SearchTool, Tool};

/// Answer a question with a Google search, summarized when needed.
#[derive(Debug, Parser)]
#[command(name = "lookout", version)]
struct Args {
    /// Config file (YAML). Defaults to the user config dir, then ./lookout.yaml.
    #[arg(long, env = "LOOKOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Overall objective the search serves. Defaults to the query.
    #[arg(long)]
    goal: Option<String>,

    /// Current task within the goal. Defaults to the query.
    #[arg(long)]
    task: Option<String>,

    /// Provider endpoint: search, news, images, ...
    #[arg(long, env = "LOOKOUT_SEARCH_TYPE")]
    search_type: Option<String>,

    /// Search query.
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

fn load_config(path: Option<&PathBuf>) -> Result<LookoutConfig> {
    let mut loader = LookoutConfigLoader::new();
    match path {
        Some(p) => loader = loader.with_file(p),
        None => {
            if let Some(default) = default_config_path() {
                loader = loader.with_optional_file(default);
            }
            loader = loader.with_optional_file("lookout.yaml");
        }
    }
    loader.load().context("failed to load configuration")
}

async fn run(args: Args) -> Result<ExitCode> {
    let cfg = load_config(args.config.as_ref())?;

    let log_path = init_logging(LogConfig::default().with_settings(&cfg.logging))?;
    tracing::info!(log_path = %log_path.display(), "lookout.start");

    let llm = ensure_llm_ready(&cfg.llm)
        .await
        .context("summarization model is not ready")?;
    let summarizer = Arc::new(LlmSummarizer::new(llm, cfg.model.clone()));

    let mut tool = SearchTool::new(&cfg.search, summarizer)?;
    if let Some(search_type) = args.search_type {
        tool = tool.with_search_type(search_type);
    }

    if !tool.available() {
        eprintln!(
            "{} is unavailable: set search.api_key in the config file or LOOKOUT__SEARCH__API_KEY",
            tool.name()
        );
        return Ok(ExitCode::from(2));
    }

    let query = args.query.join(" ");
    let goal = args.goal.unwrap_or_else(|| query.clone());
    let task = args.task.unwrap_or_else(|| query.clone());

    let mut stream = tool.call(&goal, &task, &query).await?;
    let mut stdout = std::io::stdout().lock();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        stdout.write_all(chunk.text.as_bytes())?;
        stdout.flush()?;
        if chunk.is_final {
            break;
        }
    }
    writeln!(stdout)?;
    tracing::info!("lookout.done");
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    run(Args::parse()).await
}
