//! `dagctl`: the REPL binary for the agent runtime (spec §6).

mod commands;
mod repl;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dagctl_adapters::{HttpLlmClient, LlmClient};
use dagctl_core::{ModeConfig, SessionRegistry};
use dagctl_runtime::{AgentRuntime, AgentRuntimeConfig};
use dagctl_scheduler::{Scheduler, SchedulerConfig};
use dagctl_storage::{paths, ConfigLoader, ModesStore};
use dagctl_tools::ToolRegistry;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dagctl", about = "Conversational data-analysis agent runtime")]
struct Cli {
    /// Path to `agents.yaml`. Defaults to `$DAGCTL_CONFIG` or the standard path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Resume an existing session id instead of creating a new one.
    #[arg(long)]
    session: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP/SSE/WebSocket server instead of the REPL.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long)]
        port: Option<u16>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dagctl=info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!(error = %e, "dagctl failed to start");
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(paths::config_path);
    let config = Arc::new(ConfigLoader::load(&config_path).context("loading agents.yaml")?);

    let sessions = Arc::new(SessionRegistry::new(paths::sessions_dir()));
    let tools = Arc::new(ToolRegistry::new());
    config.current().tools.apply(&tools);

    let modes_store = ModesStore::new(paths::modes_path());
    let initial_modes: ModeConfig = modes_store.load();
    let modes = Arc::new(dagctl_core::ModeManager::new(initial_modes));

    let scheduler = Arc::new(Scheduler::new(tools.clone(), SchedulerConfig::default()));
    let runtime = Arc::new(AgentRuntime::new(tools.clone(), scheduler, AgentRuntimeConfig::default()));
    let llm: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::from_env());

    match cli.command {
        Some(Command::Serve { host, port }) => {
            let port = port.unwrap_or(config.current().server.port);
            let state = Arc::new(dagctl_server::AppState::new(sessions, tools, modes, runtime, config, llm));
            dagctl_server::serve(state, &host, port).await.context("server exited")?;
            Ok(())
        }
        None => {
            let session = sessions.create(cli.session).context("creating session")?;
            repl::run(session, tools, modes, modes_store, llm).await
        }
    }
}
