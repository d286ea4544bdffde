//! LatentFlow command-line driver
//!
//! - `run`: feed intent frames through per-session decision runtimes
//! - `plan`: dry-run the constrained planner for one frame
//! - `verify-audit`: replay an audit log's hash chain

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use latentflow_runtime::{LoggingConfig, RuntimeConfig};
use latentflow_state::LatentState;
use latentflow_types::IntentFrame;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod frames;
mod run;
mod tools;

#[derive(Parser)]
#[command(name = "latentflow")]
#[command(about = "LatentFlow - transactional decision runtime", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LATENTFLOW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSONL file of intent frames and print one decision per line
    Run {
        /// Intent frames, one per line
        #[arg(short, long)]
        frames: PathBuf,
    },

    /// Show the plan the planner would choose for a frame
    Plan {
        /// Intent frame as JSON
        #[arg(short, long)]
        frame: String,
    },

    /// Verify the hash chain of an audit log
    VerifyAudit {
        /// Audit log path
        path: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => {
            RuntimeConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
        }
        None => Ok(RuntimeConfig::default()),
    }
}

/// Logs go to stderr; stdout carries results only.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());

    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Run { frames: path } => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let sessions = frames::parse_frames(&text)?;
            let decisions = run::run_sessions(&config, tools::demo_registry(), sessions).await?;

            let mut out = std::io::stdout().lock();
            for decision in &decisions {
                serde_json::to_writer(&mut out, decision)?;
                writeln!(out)?;
            }
        }
        Commands::Plan { frame } => {
            let frame: IntentFrame = serde_json::from_str(&frame).context("invalid intent frame")?;
            let state = LatentState::new(&config.state);
            let (plan, trace) = config.build_planner().plan(&frame, Some(&state));
            println!("{}", serde_json::to_string_pretty(&json!({ "plan": plan, "trace": trace }))?);
        }
        Commands::VerifyAudit { path } => {
            let report = latentflow_audit::verify_chain(&path)
                .with_context(|| format!("failed to read audit log {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.valid {
                bail!(
                    "audit chain broken at line {}",
                    report.first_invalid_line.unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
