//! Recognised REPL commands (spec §6): `exit`/`quit`/`q`, `:<n>` step
//! detail, and `/`-prefixed mode toggles.

use crate::repl::ReplState;
use dagctl_core::PreviewLimit;

pub enum CommandOutcome {
    /// The input was a recognised command and has been handled.
    Handled,
    /// The REPL should terminate.
    Exit,
    /// Not a command; the caller should treat it as a chat turn.
    NotACommand,
}

pub async fn dispatch(input: &str, state: &mut ReplState) -> CommandOutcome {
    let lower = input.to_ascii_lowercase();

    if matches!(lower.as_str(), "exit" | "quit" | "q") {
        return CommandOutcome::Exit;
    }

    if let Some(rest) = input.strip_prefix(':') {
        return show_step(rest, state);
    }

    if let Some(rest) = input.strip_prefix('/') {
        return run_slash_command(rest, state);
    }

    CommandOutcome::NotACommand
}

fn show_step(rest: &str, state: &ReplState) -> CommandOutcome {
    let Ok(n) = rest.parse::<usize>() else {
        println!("usage: :<step number>, e.g. :3");
        return CommandOutcome::Handled;
    };

    match state.steps.iter().find(|s| s.step == n) {
        Some(step) => {
            println!();
            println!("---- step {}: {} ----", step.step, step.tool);
            println!("args: {}", step.args);
            println!();
            println!("result:");
            println!("{}", step.result_preview);
            if step.truncated {
                println!("(truncated)");
            }
            println!("----");
        }
        None => println!("step {n} does not exist"),
    }
    CommandOutcome::Handled
}

fn run_slash_command(rest: &str, state: &mut ReplState) -> CommandOutcome {
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or("");
    let arg = parts.next();

    match name {
        "help" => print_help(),
        "modes" => print_modes(state),
        "plan" => match arg {
            Some("on") => state.modes.set_plan_mode(true),
            Some("off") | Some("auto") => state.modes.set_plan_mode(false),
            _ => println!("usage: /plan on|off|auto"),
        },
        "auto" => match arg {
            Some("on") => state.modes.set_auto_execute(true),
            Some("off") => state.modes.set_auto_execute(false),
            _ => println!("usage: /auto on|off"),
        },
        "safe" => match arg {
            Some("on") => state.modes.set_safe_mode(true),
            Some("off") => state.modes.set_safe_mode(false),
            _ => println!("usage: /safe on|off"),
        },
        "verbose" => match arg {
            Some("on") => state.modes.set_verbose(true),
            Some("off") => state.modes.set_verbose(false),
            _ => println!("usage: /verbose on|off"),
        },
        "preview" => match arg {
            Some("10") => state.modes.set_preview_limit(PreviewLimit::Small),
            Some("50") => state.modes.set_preview_limit(PreviewLimit::Medium),
            Some("100") => state.modes.set_preview_limit(PreviewLimit::Large),
            Some("all") => state.modes.set_preview_limit(PreviewLimit::Full),
            _ => println!("usage: /preview 10|50|100|all"),
        },
        "export" => match arg {
            Some("on") => {
                state.modes.set_export_mode(true);
                println!("export mode on: tool results will be saved to the session export directory");
            }
            Some("off") => {
                state.modes.set_export_mode(false);
                println!("export mode off");
            }
            _ => println!("usage: /export on|off"),
        },
        "reset" => {
            state.modes.reset_to_defaults();
            println!("modes reset to defaults");
        }
        "clear" => {
            state.history = match dagctl_runtime::ConversationHistory::new(dagctl_runtime::HistoryConfig::default()) {
                Ok(h) => h,
                Err(e) => {
                    println!("failed to reset history: {e}");
                    return CommandOutcome::Handled;
                }
            };
            state.steps.clear();
            println!("conversation history cleared");
        }
        "config" => print_config(state),
        "reload" => match state.modes_store.save(&state.modes.get_all()) {
            Ok(()) => println!("modes.json saved"),
            Err(e) => println!("failed to save modes.json: {e}"),
        },
        "steps" => print_steps(state),
        _ => println!("unrecognised command: /{name}. type /help for a list"),
    }

    CommandOutcome::Handled
}

fn print_help() {
    println!("recognised commands:");
    println!("  exit | quit | q        leave the REPL");
    println!("  :<n>                   show detail for step n of the last turn");
    println!("  /help                  this message");
    println!("  /modes                 show current mode values");
    println!("  /plan on|off|auto      require an approved plan before DAG execution");
    println!("  /auto on|off           auto-execute tool calls without per-step approval");
    println!("  /safe on|off           require confirmation before data-modifying tools");
    println!("  /verbose on|off        show intermediate thinking/tool detail");
    println!("  /preview 10|50|100|all row cap for tabular previews");
    println!("  /export on|off         auto-save tool results to the session export directory");
    println!("  /reset                 reset modes to defaults");
    println!("  /clear                 clear conversation history and step log");
    println!("  /config                show the loaded configuration summary");
    println!("  /reload                persist current modes to modes.json");
    println!("  /steps                 list steps from the last turn");
}

fn print_modes(state: &ReplState) {
    let modes = state.modes.get_all();
    println!("plan_mode:    {}", modes.plan_mode);
    println!("auto_execute: {}", modes.auto_execute);
    println!("safe_mode:    {}", modes.safe_mode);
    println!("verbose:      {}", modes.verbose);
    println!("preview_limit: {}", modes.preview_limit);
    println!("export_mode:  {}", modes.export_mode);
}

fn print_config(state: &ReplState) {
    println!("session:    {}", state.session.id.as_str());
    println!("tools:      {} registered", state.tools.names().len());
    println!("sandbox:    {}", if state.session.is_sandbox_available() { "available" } else { "unavailable" });
}

fn print_steps(state: &ReplState) {
    if state.steps.is_empty() {
        println!("no steps recorded for the last turn");
        return;
    }
    for step in &state.steps {
        println!("{:>3}  {}", step.step, step.tool);
    }
    println!("enter :<n> to inspect a step");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagctl_adapters::fake::FakeLlmClient;
    use dagctl_core::tool_call::ToolCallRecord;
    use dagctl_core::{ModeManager, SessionRegistry};
    use dagctl_runtime::{ConversationHistory, HistoryConfig};
    use serde_json::Value;
    use std::sync::Arc;

    fn test_state() -> (tempfile::TempDir, ReplState) {
        let tmp = tempfile::tempdir().unwrap();
        let sessions = SessionRegistry::new(tmp.path());
        let session = sessions.create(None).unwrap();
        let state = ReplState {
            session,
            tools: Arc::new(ToolRegistry::new()),
            modes: Arc::new(ModeManager::new(dagctl_core::ModeConfig::default())),
            modes_store: dagctl_storage::ModesStore::new(tmp.path().join("modes.json")),
            llm: Arc::new(FakeLlmClient::new("ok")),
            history: ConversationHistory::new(HistoryConfig::default()).unwrap(),
            steps: Vec::new(),
        };
        (tmp, state)
    }

    #[tokio::test]
    async fn exit_aliases_all_terminate() {
        let (_tmp, mut state) = test_state();
        for word in ["exit", "quit", "q", "EXIT"] {
            assert!(matches!(dispatch(word, &mut state).await, CommandOutcome::Exit));
        }
    }

    #[tokio::test]
    async fn plain_text_is_not_a_command() {
        let (_tmp, mut state) = test_state();
        assert!(matches!(dispatch("show me revenue by region", &mut state).await, CommandOutcome::NotACommand));
    }

    #[tokio::test]
    async fn slash_safe_toggles_explicit_value_not_relative() {
        let (_tmp, mut state) = test_state();
        assert!(state.modes.get_all().safe_mode);
        dispatch("/safe off", &mut state).await;
        assert!(!state.modes.get_all().safe_mode);
        dispatch("/safe off", &mut state).await;
        assert!(!state.modes.get_all().safe_mode);
        dispatch("/safe on", &mut state).await;
        assert!(state.modes.get_all().safe_mode);
    }

    #[tokio::test]
    async fn step_lookup_reports_missing_step() {
        let (_tmp, mut state) = test_state();
        state.steps.push(ToolCallRecord::new(1, "query_database", Value::Null, "42 rows", 0));
        assert!(matches!(dispatch(":1", &mut state).await, CommandOutcome::Handled));
        assert!(matches!(dispatch(":9", &mut state).await, CommandOutcome::Handled));
    }

    #[tokio::test]
    async fn clear_resets_history_and_steps() {
        let (_tmp, mut state) = test_state();
        state.history.push(dagctl_adapters::ChatMessage::user("hi"));
        state.steps.push(ToolCallRecord::new(1, "t", Value::Null, "r", 0));
        dispatch("/clear", &mut state).await;
        assert!(state.history.messages().is_empty());
        assert!(state.steps.is_empty());
    }
}
