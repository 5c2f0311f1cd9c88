mod backoff;
mod cli;
mod config;
mod error;
mod generation;
mod logging;
mod openai;
mod runner;
mod state_machine;
mod storage;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use console::Style;
use tracing::{info, warn};

use cli::{Cli, Command, RunArgs};
use config::PdgConfig;
use generation::{AdapterOptions, AnalysisMode, GenerationAdapter, Generator};
use openai::{OpenAiClient, OpenAiError};
use runner::{BatchRunner, Shutdown, SignalAction};
use storage::{Ledger, LedgerStats, OutputLayout, read_work_items};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    let config = PdgConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => run_batch(config, args).await,
        Command::Generate {
            name,
            features,
            fast_mode,
        } => generate_one(config, &name, &features, fast_mode).await,
        Command::Status { out } => show_status(&out),
    }
}

fn build_adapter(config: &PdgConfig, mode: AnalysisMode) -> Result<GenerationAdapter<OpenAiClient>> {
    let client = OpenAiClient::with_base_url(
        config.api_key.clone(),
        config.api_base.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    Ok(GenerationAdapter::new(
        client,
        AdapterOptions {
            model: config.model.clone(),
            mode,
            enforce_limits: config.run.enforce_limits,
        },
    ))
}

async fn run_batch(mut config: PdgConfig, args: RunArgs) -> Result<()> {
    args.apply(&mut config.run);
    config.run.validate()?;
    if config.api_key.is_empty() {
        bail!(OpenAiError::MissingApiKey);
    }

    let items = read_work_items(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let layout = OutputLayout::create(&args.out)?;
    let adapter = build_adapter(&config, AnalysisMode::from_fast_flag(config.run.fast_mode))?;

    let shutdown = Shutdown::new();
    let watcher = Arc::clone(&shutdown);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match watcher.signal() {
                SignalAction::Graceful => {
                    warn!("interrupt received, stopping after the current attempt (Ctrl-C again to quit)");
                }
                SignalAction::ForceExit => {
                    warn!("second interrupt, exiting now");
                    std::process::exit(130);
                }
            }
        }
    });

    let mut runner = BatchRunner::new(adapter, layout, &config.run, shutdown).with_progress(true);
    let summary = runner.run(&items, args.start, args.max).await?;
    if summary.interrupted {
        info!("run interrupted; rerun the same command to resume");
    }
    Ok(())
}

async fn generate_one(mut config: PdgConfig, name: &str, features: &str, fast_mode: bool) -> Result<()> {
    config.run.fast_mode |= fast_mode;
    let adapter = build_adapter(&config, AnalysisMode::from_fast_flag(config.run.fast_mode))?;
    let (result, seo) = adapter.produce(name, features).await?;
    let output = serde_json::json!({ "result": result, "seo": seo });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn show_status(out: &std::path::Path) -> Result<()> {
    let ledger = Ledger::open(OutputLayout::existing(out).ledger_path());
    let rows = ledger.read_all()?;
    if rows.is_empty() {
        println!("No ledger at {}", ledger.path().display());
        return Ok(());
    }

    let stats = LedgerStats::from_rows(&rows);
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();
    println!("{}", ledger.path().display());
    println!("  rows:   {}", stats.rows);
    println!("  {} {}", green.apply_to("ok:    "), stats.ok);
    println!("  {} {}", red.apply_to("failed:"), stats.failed_indices.len());
    if !stats.failed_indices.is_empty() {
        let indices: Vec<String> = stats.failed_indices.iter().map(usize::to_string).collect();
        println!("  failed indices: {}", indices.join(", "));
    }
    Ok(())
}
