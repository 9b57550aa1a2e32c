//! Command-line interface for marketbrief-rs
//!
//! Every command prints a JSON envelope with a `success` flag on
//! stdout; failures set `success: false` and exit with status 1.

use brief_engine::{
    AiManager, AnalysisPipeline, CollectRequest, EngineConfig, SessionId, SessionStore,
};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

#[derive(Parser, Debug)]
#[command(name = "brief")]
#[command(about = "Market analysis report generator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Step 1: collect web research into a new session
    Collect {
        /// Product under analysis
        #[arg(long, default_value = "")]
        product: String,

        /// Market niche
        #[arg(long, default_value = "")]
        niche: String,

        /// Target audience
        #[arg(long, default_value = "")]
        audience: String,
    },

    /// Step 2: synthesize the collected research of a session
    Synthesize {
        /// Session id from a previous collect
        session_id: String,
    },

    /// Step 3: compile the final Markdown report of a session
    Report {
        /// Session id from a previous synthesize
        session_id: String,
    },

    /// Run all three steps in sequence
    Run {
        /// Product under analysis
        #[arg(long, default_value = "")]
        product: String,

        /// Market niche
        #[arg(long, default_value = "")]
        niche: String,

        /// Target audience
        #[arg(long, default_value = "")]
        audience: String,
    },

    /// Show the workflow stage of a session
    Status {
        /// Session id to inspect
        session_id: String,
    },

    /// List all sessions in the data directory
    Sessions,

    /// Show configured API keys, pacing and the model hierarchy
    Keys,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    brief_utils::init_tracing();

    let cli = Cli::parse();
    let config = EngineConfig::from_env();

    match execute(cli.command, &config).await {
        Ok(envelope) => {
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(())
        }
        Err(e) => {
            let envelope = json!({ "success": false, "error": e.to_string() });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            std::process::exit(1);
        }
    }
}

async fn execute(command: Command, config: &EngineConfig) -> anyhow::Result<Value> {
    match command {
        Command::Collect {
            product,
            niche,
            audience,
        } => {
            let pipeline = pipeline(config)?;
            let summary = pipeline
                .collect(&CollectRequest {
                    product,
                    niche,
                    audience,
                })
                .await?;
            Ok(json!({
                "success": true,
                "session_id": summary.session_id,
                "queries": summary.queries,
                "result_count": summary.result_count,
                "report_path": summary.report_path,
            }))
        }

        Command::Synthesize { session_id } => {
            let session = SessionId::parse(&session_id)?;
            let pipeline = pipeline(config)?;
            let summary = pipeline.synthesize(&session).await?;
            Ok(json!({
                "success": true,
                "session_id": summary.session_id,
                "fallback_used": summary.fallback_used,
                "model": summary.model,
                "searches_used": summary.searches_used,
                "path": summary.path,
            }))
        }

        Command::Report { session_id } => {
            let session = SessionId::parse(&session_id)?;
            let pipeline = pipeline(config)?;
            let summary = pipeline.report(&session).await?;
            Ok(json!({
                "success": true,
                "session_id": summary.session_id,
                "report_path": summary.report_path,
                "fallback_used": summary.fallback_used,
            }))
        }

        Command::Run {
            product,
            niche,
            audience,
        } => {
            let pipeline = pipeline(config)?;
            let outcome = pipeline
                .run(&CollectRequest {
                    product,
                    niche,
                    audience,
                })
                .await?;
            Ok(json!({
                "success": true,
                "session_id": outcome.session_id,
                "report_path": outcome.report_path,
                "fallback_used": outcome.fallback_used,
            }))
        }

        Command::Status { session_id } => {
            let session = SessionId::parse(&session_id)?;
            let store = SessionStore::new(config.data_dir.clone());
            Ok(json!({
                "success": true,
                "session_id": session,
                "status": store.status(&session),
            }))
        }

        Command::Sessions => {
            let store = SessionStore::new(config.data_dir.clone());
            let sessions = store.sessions()?;
            Ok(json!({
                "success": true,
                "count": sessions.len(),
                "sessions": sessions,
            }))
        }

        Command::Keys => {
            let manager = AiManager::from_env(config)?;
            Ok(json!({
                "success": true,
                "status": manager.status(),
            }))
        }
    }
}

fn pipeline(config: &EngineConfig) -> anyhow::Result<AnalysisPipeline> {
    let manager = AiManager::from_env(config)?;
    Ok(AnalysisPipeline::new(manager, config))
}
