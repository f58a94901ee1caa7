//! The interactive REPL loop (spec §6). Recognised inputs mirror
//! `original_source/cli/sync_cli.py`'s `SyncCLI`: free text goes to the
//! agent runtime, `:<n>` shows a past step's detail, and `/`-prefixed
//! words toggle modes.

use crate::commands::{self, CommandOutcome};
use anyhow::Result;
use dagctl_adapters::{ChatMessage, LlmClient};
use dagctl_core::tool_call::ToolCallRecord;
use dagctl_core::{ModeManager, Session};
use dagctl_runtime::{ConversationHistory, HistoryConfig};
use dagctl_storage::ModesStore;
use dagctl_tools::ToolRegistry;
use std::io::Write;
use std::sync::Arc;

pub struct ReplState {
    pub session: Arc<Session>,
    pub tools: Arc<ToolRegistry>,
    pub modes: Arc<ModeManager>,
    pub modes_store: ModesStore,
    pub llm: Arc<dyn LlmClient>,
    pub history: ConversationHistory,
    pub steps: Vec<ToolCallRecord>,
}

pub async fn run(
    session: Arc<Session>,
    tools: Arc<ToolRegistry>,
    modes: Arc<ModeManager>,
    modes_store: ModesStore,
    llm: Arc<dyn LlmClient>,
) -> Result<()> {
    let history = ConversationHistory::new(HistoryConfig::default())?;
    let mut state = ReplState { session, tools, modes, modes_store, llm, history, steps: Vec::new() };

    print_welcome(&state);

    let stdin = std::io::stdin();
    loop {
        print!("you: ");
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\ngoodbye");
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match commands::dispatch(input, &mut state).await {
            CommandOutcome::Handled => continue,
            CommandOutcome::Exit => {
                println!("goodbye");
                break;
            }
            CommandOutcome::NotACommand => {}
        }

        if let Err(e) = process_turn(&mut state, input).await {
            eprintln!("turn failed: {e}");
        }
    }

    Ok(())
}

fn print_welcome(state: &ReplState) {
    println!();
    println!("agent ready");
    println!("session: {}", state.session.id.as_str());
    println!("exports: {}", state.session.export_dir.display());
    println!("type /help for commands, exit to quit");
    println!();
}

async fn process_turn(state: &mut ReplState, input: &str) -> Result<()> {
    state.history.push(ChatMessage::user(input));
    state.history.compact_if_needed(state.llm.as_ref()).await?;

    println!("thinking...");
    let reply = state.llm.complete(state.history.messages()).await?;

    state.history.push(ChatMessage::assistant(reply.clone()));
    state.history.compact_if_needed(state.llm.as_ref()).await?;

    println!();
    println!("{reply}");
    println!();

    if !state.steps.is_empty() {
        println!("(ran {} step(s), use :1-:{} to inspect)", state.steps.len(), state.steps.len());
    }

    Ok(())
}
